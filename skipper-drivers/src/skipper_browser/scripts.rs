//! Page-side scripts executed through WebDriver `execute`.
//!
//! Elements never leave the page. Scripts that find elements store them in a
//! per-window registry (`window.__skipperRefs`) and return their indices; later
//! scripts look them up by index. `arguments[0]` of every registry script is
//! the pass generation: a generation change empties the registry, so handles
//! from an earlier pass fail as stale instead of pointing at reused slots.

macro_rules! registry_prelude {
    () => {
        r#"
        const generation = arguments[0];
        let registry = window.__skipperRefs;
        if (!registry || registry.generation !== generation) {
            registry = window.__skipperRefs = { generation: generation, items: [] };
        }
        const keep = (node) => { registry.items.push(node); return registry.items.length - 1; };
        const lookup = (handle) => {
            const node = registry.items[handle];
            if (!node || !node.isConnected) throw new Error('stale element handle ' + handle);
            return node;
        };
        const scope = (handle) => {
            if (handle === null) return document;
            const root = lookup(handle).shadowRoot;
            if (!root) throw new Error('stale element handle ' + handle + ' has no shadow root');
            return root;
        };
        "#
    };
}

/// Scripts used by the WebDriver DOM host.
pub struct PageScripts;

impl PageScripts {
    /// `(generation, scope, selector)` → handles of light-DOM matches.
    pub fn query_all() -> &'static str {
        concat!(
            registry_prelude!(),
            r#"return Array.from(scope(arguments[1]).querySelectorAll(arguments[2])).map(keep);"#
        )
    }

    /// `(generation, scope)` → handles of light-DOM descendants with an open shadow root.
    pub fn shadow_hosts() -> &'static str {
        concat!(
            registry_prelude!(),
            r#"return Array.from(scope(arguments[1]).querySelectorAll('*'))
                .filter((node) => node.shadowRoot)
                .map(keep);"#
        )
    }

    /// `(generation, handle, name)` → attribute value or `null`.
    pub fn attribute() -> &'static str {
        concat!(
            registry_prelude!(),
            r#"return lookup(arguments[1]).getAttribute(arguments[2]);"#
        )
    }

    /// `(generation, handle)` → dispatches `click()`.
    pub fn click() -> &'static str {
        concat!(
            registry_prelude!(),
            r#"lookup(arguments[1]).click(); return null;"#
        )
    }

    /// `(generation, handle, checked)` → sets the `checked` property.
    pub fn set_checked() -> &'static str {
        concat!(
            registry_prelude!(),
            r#"lookup(arguments[1]).checked = arguments[2]; return null;"#
        )
    }

    /// `()` → one entry per light-DOM iframe: its `window.frames` index, whether
    /// its document is reachable from this window, and its `src`.
    pub fn frames() -> &'static str {
        r#"
        return Array.from(document.querySelectorAll('iframe')).map((frame) => {
            let index = null;
            for (let i = 0; i < window.frames.length; i++) {
                if (window.frames[i] === frame.contentWindow) { index = i; break; }
            }
            let accessible = false;
            try {
                accessible = !!(frame.contentDocument || (frame.contentWindow && frame.contentWindow.document));
            } catch (e) {
                accessible = false;
            }
            return { index: index, accessible: accessible, src: frame.getAttribute('src') };
        });
        "#
    }

    pub fn location() -> &'static str {
        r#"return document.location ? document.location.href : null;"#
    }

    pub fn ready_state() -> &'static str {
        r#"return document.readyState;"#
    }

    /// Installs a child-list/subtree observer on `document.body` once per
    /// document. Returns whether an observer is active.
    pub fn observe_mutations() -> &'static str {
        r#"
        if (window.__skipperObserver) return true;
        if (!document.body) return false;
        window.__skipperMutations = 0;
        window.__skipperObserver = new MutationObserver(() => { window.__skipperMutations += 1; });
        window.__skipperObserver.observe(document.body, { childList: true, subtree: true });
        return true;
        "#
    }

    /// Returns and resets the number of observer callbacks since the last call.
    pub fn take_mutation_batches() -> &'static str {
        r#"
        const batches = window.__skipperMutations || 0;
        window.__skipperMutations = 0;
        return batches;
        "#
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_scripts_share_the_prelude() {
        for script in [
            PageScripts::query_all(),
            PageScripts::shadow_hosts(),
            PageScripts::attribute(),
            PageScripts::click(),
            PageScripts::set_checked(),
        ] {
            assert!(script.contains("window.__skipperRefs"));
            assert!(script.contains("return"));
        }
    }

    #[test]
    fn signal_scripts_do_not_touch_the_registry() {
        for script in [
            PageScripts::frames(),
            PageScripts::observe_mutations(),
            PageScripts::take_mutation_batches(),
        ] {
            assert!(!script.contains("__skipperRefs"));
        }
    }
}
