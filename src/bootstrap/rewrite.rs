//! Per-page rewriting of the navigation fragment.
//!
//! The fragment is authored once and is location-agnostic. Before injection
//! its root links and search form are pointed at the page's root prefix and
//! the search input is prefilled from the URL.

use std::cell::RefCell;
use std::rc::Rc;

use lol_html::errors::RewritingError;
use lol_html::{RewriteStrSettings, element, rewrite_str};

use crate::site::nav::{LEGACY_SEARCH_INPUT_ID, ROOT_LINK_ATTR, SEARCH_FORM_ID, SEARCH_INPUT_ID};
use crate::site::paths::{HOME_PAGE, RootPrefix};

/// A root link after rewriting: the declared target and the resulting href.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RootLink {
    pub target: String,
    pub href: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RewrittenFragment {
    pub html: String,
    pub root_links: Vec<RootLink>,
    /// New `action` of the search form, if the fragment has one.
    pub form_action: Option<String>,
    /// Id of the input that received the restored query.
    pub query_input: Option<&'static str>,
}

#[derive(Default)]
struct State {
    links: Vec<RootLink>,
    form_action: Option<String>,
    query_input: Option<&'static str>,
}

/// Rewrite `html` for a page at `prefix`, restoring `query` into the search
/// input (primary id first, legacy id if the primary is absent).
pub fn rewrite_fragment(
    html: &str,
    prefix: RootPrefix,
    query: Option<&str>,
) -> Result<RewrittenFragment, RewritingError> {
    let state = Rc::new(RefCell::new(State::default()));
    let action = prefix.join(HOME_PAGE);

    let mut handlers = vec![
        element!(format!("[{ROOT_LINK_ATTR}]"), {
            let state = Rc::clone(&state);
            move |el| {
                let target = el.get_attribute(ROOT_LINK_ATTR).unwrap_or_default();
                let href = prefix.join(&target);
                el.set_attribute("href", &href)?;
                state.borrow_mut().links.push(RootLink { target, href });
                Ok(())
            }
        }),
        element!(format!("form#{SEARCH_FORM_ID}"), {
            let state = Rc::clone(&state);
            let action = action.clone();
            move |el| {
                el.set_attribute("action", &action)?;
                state.borrow_mut().form_action = Some(action.clone());
                Ok(())
            }
        }),
    ];
    if let Some(q) = query {
        handlers.push(restore_handler(SEARCH_INPUT_ID, q, &state));
    }

    let mut out = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: handlers,
            ..RewriteStrSettings::default()
        },
    )?;

    let restored = state.borrow().query_input.is_some();
    if let Some(q) = query
        && !restored
    {
        out = rewrite_str(
            &out,
            RewriteStrSettings {
                element_content_handlers: vec![restore_handler(LEGACY_SEARCH_INPUT_ID, q, &state)],
                ..RewriteStrSettings::default()
            },
        )?;
    }

    let state = state.take();
    Ok(RewrittenFragment {
        html: out,
        root_links: state.links,
        form_action: state.form_action,
        query_input: state.query_input,
    })
}

fn restore_handler<'h>(
    id: &'static str,
    query: &str,
    state: &Rc<RefCell<State>>,
) -> (
    std::borrow::Cow<'static, lol_html::Selector>,
    lol_html::ElementContentHandlers<'h>,
) {
    let state = Rc::clone(state);
    let query = query.to_string();
    element!(format!("input#{id}"), move |el| {
        let mut state = state.borrow_mut();
        // first match only
        if state.query_input.is_none() {
            el.set_attribute("value", &query)?;
            state.query_input = Some(id);
        }
        Ok(())
    })
}
