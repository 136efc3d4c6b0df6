//! Hyperlink extraction from simple index listing pages.
//!
//! Pages are parsed with an HTML5 parser, so quoted attribute values may
//! contain `>` (as `data-requires-python=">=3.8"` does) and character
//! references are decoded by the parser itself.

use scraper::{Html, Selector};
use std::sync::LazyLock;

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("valid anchor selector"));

/// One anchor on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Link text with nested tags removed and entities decoded.
    pub text: String,
    /// Entity-decoded `href` value; `None` for anchors without one.
    pub href: Option<String>,
}

/// Every anchor of `html` in page order.
pub fn links(html: &str) -> Vec<Link> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR)
        .map(|anchor| Link {
            text: anchor.text().collect::<String>().trim().to_string(),
            href: anchor.value().attr("href").map(|href| href.trim().to_string()),
        })
        .collect()
}
