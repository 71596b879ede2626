//! Browser side of the admissions pages.
//!
//! Wires the `searchInput` box to the `applicantsTable` rows and exposes the
//! `confirmApprove` / `confirmReject` guards the review forms call before
//! submitting.

use shared::{
    confirm::{self, Prompter},
    roster::{apply_filter, NameQuery, RosterRow, Visibility},
};
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{Document, Event, HtmlElement, HtmlInputElement};

const SEARCH_INPUT_ID: &str = "searchInput";
const ROW_SELECTOR: &str = "#applicantsTable tbody tr";
const NAME_CELL_SELECTOR: &str = ".name-col";

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        return Ok(());
    };

    if document.ready_state() == "loading" {
        let ready = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
            let Some(document) = document_or_none() else {
                return;
            };
            if let Err(err) = bind_search(&document) {
                web_sys::console::error_1(&err);
            }
        });
        document.add_event_listener_with_callback(
            "DOMContentLoaded",
            ready.as_ref().unchecked_ref(),
        )?;
        ready.forget();
        return Ok(());
    }

    bind_search(&document)
}

fn document_or_none() -> Option<Document> {
    web_sys::window().and_then(|window| window.document())
}

/// Attaches the filter to the search box. A page without one has no table
/// to filter, so nothing is bound.
fn bind_search(document: &Document) -> Result<(), JsValue> {
    let Some(input) = document
        .get_element_by_id(SEARCH_INPUT_ID)
        .and_then(|element| element.dyn_into::<HtmlInputElement>().ok())
    else {
        return Ok(());
    };

    let on_input = {
        let input = input.clone();
        Closure::<dyn FnMut(Event)>::new(move |_: Event| {
            if let Some(document) = document_or_none() {
                filter_rows(&document, &input.value());
            }
        })
    };
    input.add_event_listener_with_callback("input", on_input.as_ref().unchecked_ref())?;
    on_input.forget();

    // A value restored by the browser or carried in from `?q=` applies at once.
    if !input.value().is_empty() {
        filter_rows(document, &input.value());
    }
    Ok(())
}

fn filter_rows(document: &Document, raw_query: &str) {
    let Ok(nodes) = document.query_selector_all(ROW_SELECTOR) else {
        return;
    };
    let mut rows: Vec<DomRow> = (0..nodes.length())
        .filter_map(|index| nodes.item(index))
        .filter_map(|node| node.dyn_into::<HtmlElement>().ok())
        .map(DomRow)
        .collect();

    let outcome = apply_filter(rows.iter_mut(), &NameQuery::new(raw_query));
    web_sys::console::debug_1(&JsValue::from_str(&format!(
        "name filter: {} shown, {} hidden",
        outcome.shown, outcome.hidden
    )));
}

struct DomRow(HtmlElement);

impl RosterRow for DomRow {
    fn name(&self) -> Option<String> {
        self.0
            .query_selector(NAME_CELL_SELECTOR)
            .ok()
            .flatten()
            .and_then(|cell| cell.text_content())
    }

    fn set_visibility(&mut self, visibility: Visibility) {
        let style = self.0.style();
        let result = match visibility {
            Visibility::Shown => style.remove_property("display").map(|_| ()),
            Visibility::Hidden => style.set_property("display", "none"),
        };
        if let Err(err) = result {
            web_sys::console::error_1(&err);
        }
    }
}

/// Uses the browser's blocking confirm dialog. No window, or a dialog the
/// browser refuses to show, counts as a decline.
struct WindowPrompter;

impl Prompter for WindowPrompter {
    fn confirm(&mut self, message: &str) -> bool {
        match web_sys::window() {
            Some(window) => dialog_answer(window.confirm_with_message(message)),
            None => false,
        }
    }
}

fn dialog_answer(result: Result<bool, JsValue>) -> bool {
    result.unwrap_or(false)
}

#[wasm_bindgen(js_name = confirmApprove)]
pub fn confirm_approve() -> bool {
    confirm::confirm_approve(&mut WindowPrompter)
}

#[wasm_bindgen(js_name = confirmReject)]
pub fn confirm_reject() -> bool {
    confirm::confirm_reject(&mut WindowPrompter)
}

#[cfg(all(test, target_arch = "wasm32"))]
#[path = "tests/lib_tests.rs"]
mod tests;
