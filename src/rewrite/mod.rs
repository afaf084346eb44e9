//! Content rewriters (C5-C7): HTML, CSS, JS, and the CSP-stripping policy
//! they share.

pub mod css;
pub mod csp;
pub mod html;
pub mod js;

pub use css::rewrite_css;
pub use html::{rewrite_html, Mode as HtmlMode};
pub use js::rewrite_js;
