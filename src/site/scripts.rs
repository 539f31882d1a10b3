//! JavaScript emitted with the site.
//!
//! - `site.js`: the browser side of [`crate::bootstrap`]. Loaded by every page.
//! - `search.js`: home page search over `docs.json`. Registers with
//!   `window.GroupSite` and falls back to the `site-search` event when
//!   `site.js` is absent.
//!
//! Names shared with the Rust bootstrap (fragment candidates, ids, the query
//! key, the event name, the root prefix pattern) are substituted from the
//! same constants.

use tracing::debug;

use super::nav::{LEGACY_SEARCH_INPUT_ID, NAV_FILE, ROOT_LINK_ATTR, SEARCH_FORM_ID, SEARCH_INPUT_ID, QUERY_KEY};
use super::paths::{HOME_PAGE, ROOT_PREFIX_PATTERN};
use super::renderer::SITE_ROOT_META;
use super::styles::{STYLESHEET_FILE, STYLESHEET_MARKER};
use crate::bootstrap::SEARCH_EVENT;
use crate::search::docs::DOCS_FILE;

/// Options baked into `site.js`.
#[derive(Debug, Clone, Copy)]
pub struct ScriptOptions {
    pub inject_stylesheet: bool,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            inject_stylesheet: true,
        }
    }
}

pub struct ScriptBundle {
    pub site_js: String,
    pub search_js: String,
}

pub fn generate_scripts(options: &ScriptOptions) -> ScriptBundle {
    let site_js = generate_site_js(options);
    let search_js = generate_search_js();
    debug!(
        component = "scripts",
        operation = "generate",
        inject_stylesheet = options.inject_stylesheet,
        site_bytes = site_js.len(),
        search_bytes = search_js.len(),
        "Generated site scripts"
    );
    ScriptBundle { site_js, search_js }
}

fn substitute(template: &str, options: &ScriptOptions) -> String {
    template
        .replace("__NAV_FILE__", NAV_FILE)
        .replace("__ROOT_LINK_ATTR__", ROOT_LINK_ATTR)
        .replace("__SEARCH_FORM_ID__", SEARCH_FORM_ID)
        .replace("__SEARCH_INPUT_ID__", SEARCH_INPUT_ID)
        .replace("__LEGACY_SEARCH_INPUT_ID__", LEGACY_SEARCH_INPUT_ID)
        .replace("__QUERY_KEY__", QUERY_KEY)
        .replace("__SEARCH_EVENT__", SEARCH_EVENT)
        .replace("__STYLESHEET_FILE__", STYLESHEET_FILE)
        .replace("__STYLESHEET_MARKER__", STYLESHEET_MARKER)
        .replace("__HOME_PAGE__", HOME_PAGE)
        .replace("__SITE_ROOT_META__", SITE_ROOT_META)
        .replace("__DOCS_FILE__", DOCS_FILE)
        .replace(
            "__ROOT_PREFIX_PATTERN__",
            &serde_json::Value::from(ROOT_PREFIX_PATTERN).to_string(),
        )
        .replace(
            "__INJECT_STYLESHEET__",
            if options.inject_stylesheet { "true" } else { "false" },
        )
}

fn generate_site_js(options: &ScriptOptions) -> String {
    substitute(SITE_JS, options)
}

fn generate_search_js() -> String {
    substitute(SEARCH_JS, &ScriptOptions::default())
}

const SITE_JS: &str = r#"// Navigation/search bootstrap
(function () {
    'use strict';

    var NAV_CANDIDATES = ['./__NAV_FILE__', '../__NAV_FILE__', '../../__NAV_FILE__'];
    var SUBTREE_PATTERNS = [/\/msg\//, /\/browse\//];
    var INJECT_STYLESHEET = __INJECT_STYLESHEET__;
    var ROOT_PREFIX = new RegExp(__ROOT_PREFIX_PATTERN__);
    var handlers = [];

    function rootPrefix() {
        var meta = document.querySelector('meta[name="__SITE_ROOT_META__"]');
        if (meta) {
            var declared = (meta.getAttribute('content') || '').trim();
            if (ROOT_PREFIX.test(declared)) {
                var depth = declared.split('/').filter(function (s) { return s === '..'; }).length;
                return depth === 0 ? './' : '../'.repeat(depth);
            }
        }
        var path = window.location.pathname;
        for (var i = 0; i < SUBTREE_PATTERNS.length; i++) {
            if (SUBTREE_PATTERNS[i].test(path)) return '../';
        }
        return './';
    }

    function isHome(prefix) {
        var path = window.location.pathname;
        return prefix === './' && (path === '' || /\/$/.test(path) || /(^|\/)__HOME_PAGE__$/.test(path));
    }

    function ensureStylesheet(prefix) {
        if (document.head.querySelector('link[__STYLESHEET_MARKER__]')) return;
        var link = document.createElement('link');
        link.rel = 'stylesheet';
        link.href = prefix + '__STYLESHEET_FILE__';
        link.setAttribute('__STYLESHEET_MARKER__', '');
        document.head.appendChild(link);
    }

    // Candidates are tried strictly in order; the next request is only
    // issued once the previous one has failed.
    function fetchFragment(i) {
        if (i >= NAV_CANDIDATES.length) return Promise.resolve(null);
        var url = new URL(NAV_CANDIDATES[i], window.location.href);
        return fetch(url.toString())
            .then(function (res) {
                if (!res.ok) throw new Error('status ' + res.status);
                return res.text();
            })
            .catch(function () {
                return fetchFragment(i + 1);
            });
    }

    function searchInput() {
        return document.getElementById('__SEARCH_INPUT_ID__') ||
            document.getElementById('__LEGACY_SEARCH_INPUT_ID__');
    }

    function inject(html, prefix) {
        var tpl = document.createElement('template');
        tpl.innerHTML = html.trim();
        var frag = tpl.content;
        frag.querySelectorAll('[__ROOT_LINK_ATTR__]').forEach(function (el) {
            var target = (el.getAttribute('__ROOT_LINK_ATTR__') || '').replace(/^\/+/, '');
            el.setAttribute('href', prefix + target);
        });
        var form = frag.querySelector('form#__SEARCH_FORM_ID__');
        if (form) form.setAttribute('action', prefix + '__HOME_PAGE__');
        document.body.insertBefore(frag, document.body.firstChild);
        return form;
    }

    function restoreQuery() {
        var q = new URLSearchParams(window.location.search).get('__QUERY_KEY__');
        if (q === null) return;
        var input = searchInput();
        if (input) input.value = q;
    }

    function onSubmit(prefix) {
        return function (ev) {
            ev.preventDefault();
            var input = searchInput();
            var query = input ? input.value.trim() : '';
            if (isHome(prefix)) {
                window.dispatchEvent(new CustomEvent('__SEARCH_EVENT__', { detail: query }));
                handlers.forEach(function (handler) {
                    try { handler(query); } catch (e) { /* ignored */ }
                });
                if (query) {
                    try {
                        var url = new URL(window.location.href);
                        url.searchParams.set('__QUERY_KEY__', query);
                        window.history.replaceState(null, '', url.toString());
                    } catch (e) { /* ignored */ }
                }
                return;
            }
            var home = new URL(prefix + '__HOME_PAGE__', window.location.href);
            home.searchParams.set('__QUERY_KEY__', query);
            window.location.assign(home.toString());
        };
    }

    function run() {
        var prefix = rootPrefix();
        if (INJECT_STYLESHEET) ensureStylesheet(prefix);
        return fetchFragment(0).then(function (html) {
            if (html === null) return;
            var form = inject(html, prefix);
            restoreQuery();
            if (form) form.addEventListener('submit', onSubmit(prefix));
        });
    }

    window.GroupSite = {
        registerSearch: function (handler) {
            if (typeof handler === 'function') handlers.push(handler);
        },
        rootPrefix: rootPrefix
    };

    if (document.readyState === 'loading') {
        document.addEventListener('DOMContentLoaded', run);
    } else {
        run();
    }
})();
"#;

const SEARCH_JS: &str = r#"// Home page search over __DOCS_FILE__
(function () {
    'use strict';

    var MAX_RESULTS = 100;
    var corpus = null;

    function load() {
        if (!corpus) {
            corpus = fetch('./__DOCS_FILE__')
                .then(function (res) { return res.ok ? res.json() : []; })
                .catch(function () { return []; });
        }
        return corpus;
    }

    function terms(query) {
        return query.toLowerCase().split(/\s+/).filter(Boolean);
    }

    // Every term must match somewhere; subject hits weigh most.
    function score(doc, ts) {
        var subject = (doc.subject || '').toLowerCase();
        var author = (doc.author || '').toLowerCase();
        var snippet = (doc.snippet || '').toLowerCase();
        var total = 0;
        for (var i = 0; i < ts.length; i++) {
            var t = ts[i];
            var s = (subject.indexOf(t) >= 0 ? 3 : 0) +
                (author.indexOf(t) >= 0 ? 2 : 0) +
                (snippet.indexOf(t) >= 0 ? 1 : 0);
            if (s === 0) return 0;
            total += s;
        }
        return total;
    }

    function excerpt(text, ts) {
        var lower = text.toLowerCase();
        var at = -1;
        for (var i = 0; i < ts.length && at < 0; i++) at = lower.indexOf(ts[i]);
        var start = Math.max(0, at - 60);
        return (start > 0 ? '…' : '') + text.slice(start, start + 200);
    }

    function render(results, query, ts) {
        var list = document.getElementById('search-results');
        var status = document.getElementById('search-status');
        if (!list) return;
        list.textContent = '';
        if (status) {
            status.textContent = query
                ? results.length + ' result' + (results.length === 1 ? '' : 's') + ' for "' + query + '"'
                : '';
        }
        results.slice(0, MAX_RESULTS).forEach(function (hit) {
            var doc = hit.doc;
            var li = document.createElement('li');
            var a = document.createElement('a');
            a.href = 'msg/' + encodeURIComponent(doc.id) + '.html';
            a.textContent = doc.subject || 'No subject';
            li.appendChild(a);
            var meta = document.createElement('span');
            meta.className = 'result-meta';
            meta.textContent = ' · ' + (doc.author || 'Unknown') + (doc.timestamp ? ' · ' + doc.timestamp.slice(0, 10) : '');
            li.appendChild(meta);
            if (doc.snippet) {
                var p = document.createElement('p');
                p.className = 'result-snippet';
                p.textContent = excerpt(doc.snippet, ts);
                li.appendChild(p);
            }
            list.appendChild(li);
        });
    }

    function search(query) {
        var ts = terms(query);
        if (!ts.length) {
            render([], '', ts);
            return;
        }
        load().then(function (docs) {
            var results = [];
            for (var i = 0; i < docs.length; i++) {
                var s = score(docs[i], ts);
                if (s > 0) results.push({ doc: docs[i], score: s });
            }
            results.sort(function (a, b) {
                return b.score - a.score || String(b.doc.timestamp || '').localeCompare(String(a.doc.timestamp || ''));
            });
            render(results, query, ts);
        });
    }

    // site.js calls registered handlers on submit, right after it fires the
    // event, so only one of the two paths may be wired up.
    if (window.GroupSite && typeof window.GroupSite.registerSearch === 'function') {
        window.GroupSite.registerSearch(search);
    } else {
        window.addEventListener('__SEARCH_EVENT__', function (ev) {
            search(String(ev.detail || ''));
        });
    }

    var initial = new URLSearchParams(window.location.search).get('__QUERY_KEY__');
    if (initial) search(initial);
})();
"#;
