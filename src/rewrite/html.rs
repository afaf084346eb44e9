//! HTML rewriter (C5) — parses permissively with `html5ever`/`kuchikiki`,
//! walks the DOM rewriting every URL-bearing construct, strips CSP/integrity,
//! and injects the runtime interception scripts (§4.5).
//!
//! Structurally this follows a pack HTML rewriter's DOM-walk shape (same
//! parser, same recursive walker, same `srcset`/event-handler/`<style>`
//! handling), adapted to this rewriter's exact attribute table, `/p/<token>`
//! codec, CSP-stripping (rather than CSP-merging) policy, and page/ad-frame
//! mode split.

use kuchikiki::traits::*;
use kuchikiki::{parse_html, Attribute, Attributes, ExpandedName, NodeData, NodeRef};
use markup5ever::{namespace_url, ns, LocalName};

use crate::codec::rewrite_url;
use crate::rewrite::css::rewrite_css;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Page,
    AdFrame,
}

/// Marker attribute on the first injected bootstrap script; its presence
/// means a prior pass already injected the runtime, so a second pass must
/// not inject again (§8 invariant 3: rewrite idempotence).
const INJECTED_MARKER: &str = "data-veilrelay-injected";

/// element → attribute rewrite table from §4.5.
fn rewrite_table(tag: &str) -> &'static [&'static str] {
    match tag {
        "a" => &["href"],
        "link" => &["href"],
        "script" => &["src"],
        "img" => &["src"],
        "video" => &["src", "poster"],
        "audio" => &["src"],
        "source" => &["src"],
        "iframe" => &["src"],
        "embed" => &["src"],
        "object" => &["data"],
        "form" => &["action"],
        "input" => &["src"],
        "track" => &["src"],
        "area" => &["href"],
        _ => &[],
    }
}

const SRCSET_TAGS: &[&str] = &["img", "source"];

const DATA_URL_ATTRS: &[&str] = &[
    "data-href", "data-src", "data-url", "data-link", "data-target", "data-action",
    "data-background", "data-image", "data-poster", "data-lazy-src", "data-original",
];

/// Rewrite a full HTML document. `base` is the page URL (or `<base href>` if
/// present and absolute); `mode` selects the page vs. ad-frame injection and
/// CSP policy.
pub fn rewrite_html(html: &str, base: &str, mode: Mode) -> String {
    let doc = parse_html().one(html);

    let effective_base = find_base_href(&doc)
        .filter(|href| is_absolute_http(href))
        .unwrap_or_else(|| base.to_string());
    remove_base_element(&doc);
    strip_csp_meta_tags(&doc);

    walk(&doc, &effective_base);

    if !already_injected(&doc) {
        inject_runtime(&doc, &effective_base, mode);
    }

    let mut buf = Vec::new();
    html5ever::serialize::serialize(
        &mut buf,
        &doc,
        html5ever::serialize::SerializeOpts {
            scripting_enabled: true,
            traversal_scope: html5ever::serialize::TraversalScope::IncludeNode,
            create_missing_parent: false,
        },
    )
    .expect("html serialization is infallible for an in-memory writer");

    String::from_utf8(buf).unwrap_or_else(|_| html.to_string())
}

fn is_absolute_http(url: &str) -> bool {
    matches!(url::Url::parse(url).ok().map(|u| u.scheme().to_string()).as_deref(), Some("http") | Some("https"))
}

fn walk(node: &NodeRef, base: &str) {
    if let NodeData::Element(ref el) = *node.data() {
        let tag = el.name.local.to_string().to_ascii_lowercase();
        let mut attrs = el.attributes.borrow_mut();

        attrs.remove_attr("integrity");

        for &attr in rewrite_table(&tag) {
            if let Some(val) = attrs.get_str(attr) {
                if !val.is_empty() {
                    attrs.set_str(attr, rewrite_url(&val, base));
                }
            }
        }

        if SRCSET_TAGS.contains(&tag.as_str()) {
            if let Some(val) = attrs.get_str("srcset") {
                attrs.set_str("srcset", rewrite_srcset(&val, base));
            }
        }

        for &attr in DATA_URL_ATTRS {
            if let Some(val) = attrs.get_str(attr) {
                if !val.is_empty() {
                    attrs.set_str(attr, rewrite_url(&val, base));
                }
            }
        }
        if let Some(val) = attrs.get_str("data-srcset") {
            attrs.set_str("data-srcset", rewrite_srcset(&val, base));
        }

        if tag == "meta" {
            rewrite_meta_refresh(&mut attrs, base);
        }

        if let Some(style) = attrs.get_str("style") {
            attrs.set_str("style", rewrite_css(&style, base));
        }

        drop(attrs);

        if tag == "style" {
            rewrite_style_element_content(node, base);
        }
    }

    for child in node.children() {
        walk(&child, base);
    }
}

fn rewrite_srcset(srcset: &str, base: &str) -> String {
    srcset
        .split(',')
        .map(|entry| {
            let parts: Vec<&str> = entry.trim().splitn(2, char::is_whitespace).collect();
            match parts.as_slice() {
                [url, descriptor] => format!("{} {}", rewrite_url(url, base), descriptor),
                [url] => rewrite_url(url, base),
                _ => entry.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn rewrite_meta_refresh(attrs: &mut Attributes, base: &str) {
    let is_refresh = attrs
        .get_str("http-equiv")
        .map(|v| v.eq_ignore_ascii_case("refresh"))
        .unwrap_or(false);
    if !is_refresh {
        return;
    }
    if let Some(content) = attrs.get_str("content") {
        if let Some(idx) = content.to_ascii_lowercase().find("url=") {
            let (prefix, url_part) = content.split_at(idx + 4);
            attrs.set_str("content", format!("{}{}", prefix, rewrite_url(url_part.trim(), base)));
        }
    }
}

fn rewrite_style_element_content(node: &NodeRef, base: &str) {
    let mut text = String::new();
    for child in node.children() {
        if let NodeData::Text(ref t) = *child.data() {
            text.push_str(&t.borrow());
        }
    }
    if text.is_empty() {
        return;
    }
    let rewritten = rewrite_css(&text, base);
    for child in node.children() {
        child.detach();
    }
    node.append(NodeRef::new_text(&rewritten));
}

fn find_base_href(doc: &NodeRef) -> Option<String> {
    for node in doc.inclusive_descendants() {
        if let NodeData::Element(ref el) = *node.data() {
            if el.name.local.to_string() == "base" {
                return el.attributes.borrow().get_str("href");
            }
        }
    }
    None
}

fn remove_base_element(doc: &NodeRef) {
    for node in doc.inclusive_descendants() {
        if let NodeData::Element(ref el) = *node.data() {
            if el.name.local.to_string() == "base" {
                node.detach();
                return;
            }
        }
    }
}

fn strip_csp_meta_tags(doc: &NodeRef) {
    let mut to_remove = Vec::new();
    for node in doc.inclusive_descendants() {
        if let NodeData::Element(ref el) = *node.data() {
            if el.name.local.to_string() == "meta" {
                let attrs = el.attributes.borrow();
                let equiv = attrs.get_str("http-equiv").unwrap_or_default().to_ascii_lowercase();
                if equiv == "content-security-policy" || equiv == "content-security-policy-report-only" {
                    drop(attrs);
                    to_remove.push(node.clone());
                }
            }
        }
    }
    for node in to_remove {
        node.detach();
    }
}

fn already_injected(doc: &NodeRef) -> bool {
    for node in doc.inclusive_descendants() {
        if let NodeData::Element(ref el) = *node.data() {
            if el.attributes.borrow().get_str(INJECTED_MARKER).is_some() {
                return true;
            }
        }
    }
    false
}

/// Inject the runtime scripts at the very top of `<head>`, creating `<head>`
/// if the document doesn't have one (§8 boundary behavior). Order matters:
/// WebRTC neutralization must run before the URL-interception runtime.
fn inject_runtime(doc: &NodeRef, base: &str, mode: Mode) {
    let base_json = serde_json::to_string(base).unwrap_or_else(|_| "\"\"".to_string());
    let bootstrap = format!(
        r#"<script {marker}="bootstrap">window.__veilrelay_target={base};window.__veilrelay_prefix="/p/";</script>"#,
        marker = INJECTED_MARKER,
        base = base_json,
    );
    let fragment_html = match mode {
        Mode::Page => format!(
            r#"{bootstrap}<script {marker}="webrtc" src="/assets/webrtc-neutralize.js"></script><script {marker}="runtime" src="/assets/runtime.js"></script>"#,
            bootstrap = bootstrap,
            marker = INJECTED_MARKER,
        ),
        Mode::AdFrame => format!(
            r#"{bootstrap}<script {marker}="webrtc" src="/assets/webrtc-neutralize.js"></script><script {marker}="adframe" src="/assets/adframe-runtime.js"></script>"#,
            bootstrap = bootstrap,
            marker = INJECTED_MARKER,
        ),
    };

    for node in doc.inclusive_descendants() {
        if let NodeData::Element(ref el) = *node.data() {
            if el.name.local.to_string() == "head" {
                let frag = parse_html().one(fragment_html.clone());
                match node.children().next() {
                    Some(first) => first.insert_before(frag),
                    None => node.append(frag),
                }
                return;
            }
        }
    }

    // No <head> in the document at all (malformed upstream HTML, §8
    // boundary behavior): synthesize one ahead of whatever markup exists.
    let head_html = format!("<head>{fragment_html}</head>");
    let frag = parse_html().one(head_html);
    for node in doc.inclusive_descendants() {
        if let NodeData::Element(ref el) = *node.data() {
            if el.name.local.to_string() == "html" {
                match node.children().next() {
                    Some(first) => first.insert_before(frag),
                    None => node.append(frag),
                }
                return;
            }
        }
    }
    doc.prepend(frag);
}

trait AttrsExt {
    fn get_str(&self, name: &str) -> Option<String>;
    fn set_str(&mut self, name: &str, value: String);
    fn remove_attr(&mut self, name: &str);
}

impl AttrsExt for Attributes {
    fn get_str(&self, name: &str) -> Option<String> {
        self.map
            .get(&ExpandedName::new(ns!(), LocalName::from(name)))
            .map(|a| a.value.as_str().to_string())
    }

    fn set_str(&mut self, name: &str, value: String) {
        let key = ExpandedName::new(ns!(), LocalName::from(name));
        if let Some(attr) = self.map.get_mut(&key) {
            attr.value = value.into();
        } else {
            self.map.insert(key, Attribute { prefix: None, value: value.into() });
        }
    }

    fn remove_attr(&mut self, name: &str) {
        let key = ExpandedName::new(ns!(), LocalName::from(name));
        self.map.remove(&key);
    }
}
