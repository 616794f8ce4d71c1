//! In-page scripts. Each renderer returns a complete expression ready for
//! `Runtime.evaluate`; arguments are embedded as JSON literals.

use crate::sync::state::PlaybackSample;
use serde_json::json;

/// Locates a control and activates it.
///
/// Takes `{primary: [...], fallback: [...]}`. Each selector is looked up in the
/// document, then depth-first through every shadow root below it. A match that
/// refuses activation moves on to the next selector. Never throws; evaluates
/// to `true` iff some element accepted an activation.
const RESOLVER_JS: &str = r#"
(function (candidates) {
    function findInRoot(root, sel) {
        try {
            var el = root.querySelector(sel);
            if (el) return el;
        } catch (e) {}
        var nodes;
        try {
            nodes = root.querySelectorAll('*');
        } catch (e) {
            return null;
        }
        for (var i = 0; i < nodes.length; i++) {
            var n = nodes[i];
            if (n && n.shadowRoot) {
                try {
                    var found = findInRoot(n.shadowRoot, sel);
                    if (found) return found;
                } catch (e) {}
            }
        }
        return null;
    }

    function activate(el) {
        try {
            if (typeof el.focus === 'function') el.focus();
            var rect = el.getBoundingClientRect();
            var x = rect.left + rect.width / 2;
            var y = rect.top + rect.height / 2;
            ['mousedown', 'mouseup', 'click'].forEach(function (type) {
                el.dispatchEvent(new MouseEvent(type, {
                    view: window,
                    bubbles: true,
                    cancelable: true,
                    clientX: x,
                    clientY: y,
                    button: 0
                }));
            });
            return true;
        } catch (e) {
            try {
                el.click();
                return true;
            } catch (e2) {
                return false;
            }
        }
    }

    function tryList(list) {
        for (var i = 0; i < list.length; i++) {
            try {
                var el = findInRoot(document, String(list[i]));
                if (el && activate(el)) return true;
            } catch (e) {}
        }
        return false;
    }

    try {
        var c = candidates || {};
        if (tryList(Array.isArray(c.primary) ? c.primary : [])) return true;
        return tryList(Array.isArray(c.fallback) ? c.fallback : []);
    } catch (e) {
        return false;
    }
})
"#;

/// Reads `{id, time, paused}` and returns it as a JSON string.
const CAPTURE_JS: &str = r#"
(function () {
    try {
        var id = location.hash || location.pathname || document.title || 'unknown';
        var time = 0;
        var paused = true;
        var audio = document.querySelector('audio');
        if (audio) {
            time = audio.currentTime || 0;
            paused = audio.paused;
        } else if (window.player) {
            if (typeof window.player.getCurrentTime === 'function') {
                try { time = window.player.getCurrentTime(); } catch (e) {}
            }
            if (typeof window.player.isPlaying === 'function') {
                try { paused = !window.player.isPlaying(); } catch (e) {}
            }
        }
        return JSON.stringify({ id: String(id), time: Number(time), paused: Boolean(paused) });
    } catch (e) {
        return JSON.stringify({ id: 'unknown', time: 0, paused: true });
    }
})()
"#;

/// Re-applies a saved position. Takes the sample and `{attempts, intervalMs}`.
/// Evaluates to a status: `applied`, `pending`, `abandoned`, `player` or `none`.
const RESTORE_JS: &str = r#"
(function (state, retry) {
    try {
        var audio = document.querySelector('audio');
        if (audio && state && typeof state.time === 'number') {
            var attempts = 0;
            var apply = function () {
                attempts++;
                try {
                    if (audio.readyState > 0) {
                        audio.currentTime = Math.min(state.time, audio.duration || state.time);
                        if (!state.paused) {
                            var p = audio.play();
                            if (p && typeof p.catch === 'function') p.catch(function () {});
                        }
                        return true;
                    }
                } catch (e) {}
                return false;
            };
            if (apply()) return 'applied';
            if (attempts >= retry.attempts) return 'abandoned';
            var timer = setInterval(function () {
                if (apply() || attempts >= retry.attempts) clearInterval(timer);
            }, retry.intervalMs);
            return 'pending';
        }
        if (window.player && typeof window.player.seek === 'function') {
            try {
                window.player.seek(state.time);
                if (!state.paused && typeof window.player.play === 'function') window.player.play();
            } catch (e) {}
            return 'player';
        }
    } catch (e) {}
    return 'none';
})
"#;

/// Script that activates the first control matching `primary`, then `fallback`.
pub fn activation<S: AsRef<str>>(primary: &[S], fallback: &[S]) -> String {
    let primary: Vec<&str> = primary.iter().map(AsRef::as_ref).collect();
    let fallback: Vec<&str> = fallback.iter().map(AsRef::as_ref).collect();
    let args = json!({ "primary": primary, "fallback": fallback });
    format!("{}({});", RESOLVER_JS.trim(), args)
}

/// Script that samples the page's playback state.
pub fn capture() -> String {
    CAPTURE_JS.trim().to_string()
}

/// Script that seeks/plays to `sample`, retrying up to `attempts` times in
/// total every `interval_ms` while the media element is not ready.
pub fn restore(sample: &PlaybackSample, attempts: u32, interval_ms: u64) -> String {
    let state = json!({
        "id": sample.id,
        "time": sample.time,
        "paused": sample.paused,
    });
    let retry = json!({ "attempts": attempts, "intervalMs": interval_ms });
    format!("{}({}, {});", RESTORE_JS.trim(), state, retry)
}
