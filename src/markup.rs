//! Shared HTML helpers: static selector and regex compilation, text extraction.

use regex::Regex;
use scraper::{ElementRef, Node, Selector};

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Compiles a CSS selector at static init; panics on invalid pattern.
pub(crate) fn compile_static_selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid static selector '{css}': {e}"))
}

/// Declares lazily compiled selectors, one `static` per entry.
macro_rules! static_selectors {
    ($($(#[$meta:meta])* $name:ident = $css:literal;)+) => {
        $(
            $(#[$meta])*
            static $name: ::std::sync::LazyLock<::scraper::Selector> =
                ::std::sync::LazyLock::new(|| $crate::markup::compile_static_selector($css));
        )+
    };
}
pub(crate) use static_selectors;

/// Concatenated, trimmed text content of an element.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Trimmed text of every child node of `element`, text nodes included, in order.
pub(crate) fn child_texts(element: ElementRef<'_>) -> Vec<String> {
    element
        .children()
        .map(|node| match node.value() {
            Node::Text(text) => text.trim().to_string(),
            Node::Element(_) => ElementRef::wrap(node).map(element_text).unwrap_or_default(),
            _ => String::new(),
        })
        .collect()
}

/// Returns the element's attribute value when present and non-blank.
pub(crate) fn attr<'a>(element: &ElementRef<'a>, name: &str) -> Option<&'a str> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Text of the first non-blank node following `element` among its siblings.
pub(crate) fn following_text(element: ElementRef<'_>) -> Option<String> {
    element.next_siblings().find_map(|node| {
        let text = match node.value() {
            Node::Text(text) => text.trim().to_string(),
            Node::Element(_) => ElementRef::wrap(node).map(element_text).unwrap_or_default(),
            _ => String::new(),
        };
        (!text.is_empty()).then_some(text)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use scraper::Html;

    static_selectors! {
        ANCHOR = "a";
        DIV = "div";
    }

    #[test]
    fn test_element_text_trims_and_joins_descendants() {
        let html = Html::parse_fragment("<a> Slow <b>Partner</b> Server </a>");
        let anchor = html.select(&ANCHOR).next().unwrap();
        assert_eq!(element_text(anchor), "Slow Partner Server");
    }

    #[test]
    fn test_following_text_skips_blank_siblings() {
        let html =
            Html::parse_fragment("<div><a href=\"/x\">link</a>   <span>(no waitlist)</span></div>");
        let anchor = html.select(&ANCHOR).next().unwrap();
        assert_eq!(following_text(anchor).as_deref(), Some("(no waitlist)"));
    }

    #[test]
    fn test_following_text_none_for_last_child() {
        let html = Html::parse_fragment("<div><a href=\"/x\">link</a></div>");
        let anchor = html.select(&ANCHOR).next().unwrap();
        assert!(following_text(anchor).is_none());
    }

    #[test]
    fn test_child_texts_keeps_text_nodes_in_order() {
        let html = Html::parse_fragment("<div id=\"c\">intro<span>mid</span> <b></b>end</div>");
        let div = html.select(&DIV).next().unwrap();
        assert_eq!(child_texts(div), vec!["intro", "mid", "", "", "end"]);
    }

    #[test]
    fn test_attr_value_borrows_from_document() {
        let html = Html::parse_fragment("<a href=\" /md5/abc \">x</a><a>y</a>");
        let hrefs: Vec<&str> = html
            .select(&ANCHOR)
            .filter_map(|anchor| attr(&anchor, "href"))
            .collect();
        assert_eq!(hrefs, vec!["/md5/abc"]);
    }

    #[test]
    fn test_attr_ignores_blank_values() {
        let html = Html::parse_fragment("<a href=\"  \">x</a>");
        let anchor = html.select(&ANCHOR).next().unwrap();
        assert!(attr(&anchor, "href").is_none());
    }
}
