//! Test doubles for the page's execution channel.

#![allow(dead_code)]

use boa_engine::{Context, JsValue, Source};
use futures::future;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;
use webplayer_bridge::page::{Completion, ExecutionChannel};

const FIXTURE: &str = include_str!("page_fixture.js");

type Job = Box<dyn FnOnce(&mut Context) + Send>;

/// A scripted page running the real in-page scripts in a JavaScript engine.
///
/// The engine lives on its own thread and evaluates jobs one at a time, like
/// a browser's page thread.
pub struct BoaPage {
    jobs: mpsc::Sender<Job>,
    submitted: Arc<Mutex<Vec<String>>>,
}

impl BoaPage {
    /// Start a page whose DOM is built by `setup` on top of the fixture.
    pub fn new(setup: &str) -> Self {
        let (jobs, rx) = mpsc::channel::<Job>();
        thread::spawn(move || {
            let mut ctx = Context::default();
            ctx.eval(Source::from_bytes(FIXTURE))
                .expect("fixture should evaluate");
            while let Ok(job) = rx.recv() {
                job(&mut ctx);
            }
        });

        let page = Self {
            jobs,
            submitted: Arc::new(Mutex::new(Vec::new())),
        };
        page.eval(setup).expect("page setup should evaluate");
        page
    }

    /// Evaluate `js` directly (not counted as a submission). `None` if it threw.
    pub fn eval(&self, js: &str) -> Option<Value> {
        let (tx, rx) = mpsc::channel();
        let js = js.to_string();
        self.jobs
            .send(Box::new(move |ctx: &mut Context| {
                let _ = tx.send(evaluate(ctx, &js));
            }))
            .expect("page thread alive");
        rx.recv().expect("page thread alive")
    }

    /// Evaluate `js` and parse its (string) result as JSON.
    pub fn eval_json(&self, js: &str) -> Value {
        match self.eval(js) {
            Some(Value::String(s)) => serde_json::from_str(&s).expect("JSON result"),
            other => panic!("expected a JSON string, got {:?}", other),
        }
    }

    /// Everything the page recorded: focus, pointer events, seeks, plays.
    pub fn events(&self) -> Vec<String> {
        serde_json::from_value(self.eval_json("JSON.stringify(__events)")).unwrap()
    }

    pub fn clear_events(&self) {
        self.eval("__events.length = 0;");
    }

    /// Fire pending timers `rounds` times; returns how many are still live.
    pub fn fire_timers(&self, rounds: u32) -> u64 {
        self.eval(&format!("__fireTimers({})", rounds))
            .and_then(|v| v.as_f64())
            .expect("timer count") as u64
    }

    /// How many times the media element's readiness was checked.
    pub fn ready_checks(&self) -> u64 {
        self.eval("__readyChecks")
            .and_then(|v| v.as_f64())
            .expect("ready check count") as u64
    }

    /// Scripts submitted through the channel, in order.
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

impl ExecutionChannel for BoaPage {
    fn submit(&self, script: String) -> Completion {
        self.submitted.lock().unwrap().push(script.clone());
        let (tx, rx) = tokio::sync::oneshot::channel();
        let sent = self.jobs.send(Box::new(move |ctx: &mut Context| {
            let _ = tx.send(evaluate(ctx, &script));
        }));
        if sent.is_err() {
            return Box::pin(future::ready(None));
        }
        Box::pin(async move { rx.await.ok().flatten() })
    }
}

fn evaluate(ctx: &mut Context, js: &str) -> Option<Value> {
    let value = ctx.eval(Source::from_bytes(js)).ok()?;
    Some(to_json(&value))
}

fn to_json(value: &JsValue) -> Value {
    if let Some(b) = value.as_boolean() {
        Value::Bool(b)
    } else if let Some(n) = value.as_number() {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    } else if let Some(s) = value.as_string() {
        Value::String(s.to_std_string_escaped())
    } else {
        Value::Null
    }
}

/// A page that never answers.
pub struct SilentChannel {
    pub submissions: AtomicUsize,
}

impl SilentChannel {
    pub fn new() -> Self {
        Self {
            submissions: AtomicUsize::new(0),
        }
    }
}

impl ExecutionChannel for SilentChannel {
    fn submit(&self, _script: String) -> Completion {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        Box::pin(future::pending())
    }
}

/// A page that answers every submission with a fixed value after `delay`.
pub struct CannedChannel {
    reply: Option<Value>,
    delay: Duration,
    submitted: Mutex<Vec<String>>,
}

impl CannedChannel {
    pub fn new(reply: Option<Value>) -> Self {
        Self::delayed(reply, Duration::ZERO)
    }

    pub fn delayed(reply: Option<Value>, delay: Duration) -> Self {
        Self {
            reply,
            delay,
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

impl ExecutionChannel for CannedChannel {
    fn submit(&self, script: String) -> Completion {
        self.submitted.lock().unwrap().push(script);
        let reply = self.reply.clone();
        let delay = self.delay;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            reply
        })
    }
}

/// A page that answers each submission with the next scripted reply, after
/// that reply's delay. Runs out to `None`.
pub struct ScriptedChannel {
    replies: Mutex<VecDeque<(Option<Value>, Duration)>>,
}

impl ScriptedChannel {
    pub fn new(replies: Vec<(Option<Value>, Duration)>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }
}

impl ExecutionChannel for ScriptedChannel {
    fn submit(&self, _script: String) -> Completion {
        let (reply, delay) = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((None, Duration::ZERO));
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            reply
        })
    }
}
