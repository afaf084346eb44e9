//! CSS rewriter (C6) — token-stream rewrite of `url(...)` and `@import`
//! against a CSS base URL. The closed set of cases (§9 Design Notes
//! explicitly sanctions a regex/tokenizer-level rewrite rather than a full
//! CSSOM transform) is walked with `cssparser`'s tokenizer, mirroring the
//! shape of a pack CSS rewriter but routing through the `/p/<token>` codec
//! instead of a query-string scheme.

use cssparser::{Parser, ParserInput, Token};

use crate::codec::rewrite_url;

/// Rewrite a complete stylesheet, or an inline `style="..."` fragment — both
/// call through here since the grammar subset handled is identical.
pub fn rewrite_css(css: &str, base: &str) -> String {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut out = String::with_capacity(css.len());
    rewrite_token_stream(&mut parser, base, &mut out);
    out
}

fn rewrite_token_stream(parser: &mut Parser<'_, '_>, base: &str, out: &mut String) {
    // True only directly after `@import`, so a lone quoted string there is
    // treated as a stylesheet URL rather than an arbitrary CSS string.
    let mut in_import = false;

    loop {
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(t) => t.clone(),
            Err(_) => break,
        };

        match token {
            Token::UnquotedUrl(ref url_val) => {
                out.push_str("url(");
                out.push_str(&quote_css_url(&rewrite_url(url_val.as_ref(), base)));
                out.push(')');
            }

            Token::Function(ref name) if name.eq_ignore_ascii_case("url") => {
                out.push_str("url(");
                rewrite_function_args(parser, base, out);
                out.push(')');
            }

            Token::AtKeyword(ref kw) if kw.eq_ignore_ascii_case("import") => {
                out.push_str("@import ");
                in_import = true;
            }

            Token::AtKeyword(ref kw) => {
                out.push('@');
                out.push_str(kw.as_ref());
            }

            Token::QuotedString(ref s) => {
                let s_str: &str = s.as_ref();
                if in_import {
                    out.push_str(&format!("\"{}\"", escape_css_string(&rewrite_url(s_str, base))));
                    in_import = false;
                } else {
                    out.push_str(&format!("\"{}\"", escape_css_string(s_str)));
                }
            }

            Token::CurlyBracketBlock => {
                out.push('{');
                let _ = parser.parse_nested_block(|inner| -> Result<(), ()> {
                    rewrite_token_stream(inner, base, out);
                    Ok(())
                });
                out.push('}');
            }
            Token::ParenthesisBlock => {
                out.push('(');
                let _ = parser.parse_nested_block(|inner| -> Result<(), ()> {
                    rewrite_token_stream(inner, base, out);
                    Ok(())
                });
                out.push(')');
            }
            Token::SquareBracketBlock => {
                out.push('[');
                let _ = parser.parse_nested_block(|inner| -> Result<(), ()> {
                    rewrite_token_stream(inner, base, out);
                    Ok(())
                });
                out.push(']');
            }
            Token::Function(ref name) => {
                out.push_str(name.as_ref());
                out.push('(');
                let _ = parser.parse_nested_block(|inner| -> Result<(), ()> {
                    rewrite_token_stream(inner, base, out);
                    Ok(())
                });
                out.push(')');
            }

            Token::Ident(ref v) => out.push_str(v.as_ref()),
            Token::Hash(ref v) | Token::IDHash(ref v) => {
                out.push('#');
                out.push_str(v.as_ref());
            }
            Token::Number { value, .. } => out.push_str(&format_number(value)),
            Token::Percentage { unit_value, .. } => {
                out.push_str(&format_number(unit_value * 100.0));
                out.push('%');
            }
            Token::Dimension { value, ref unit, .. } => {
                out.push_str(&format_number(value));
                out.push_str(unit.as_ref());
            }
            Token::WhiteSpace(_) => out.push(' '),
            Token::Colon => out.push(':'),
            Token::Semicolon => {
                in_import = false;
                out.push(';');
            }
            Token::Comma => out.push(','),
            Token::Delim(c) => out.push(c),
            Token::IncludeMatch => out.push_str("~="),
            Token::DashMatch => out.push_str("|="),
            Token::PrefixMatch => out.push_str("^="),
            Token::SuffixMatch => out.push_str("$="),
            Token::SubstringMatch => out.push_str("*="),
            Token::CDO => out.push_str("<!--"),
            Token::CDC => out.push_str("-->"),
            Token::Comment(ref c) => {
                out.push_str("/*");
                out.push_str(c.as_ref());
                out.push_str("*/");
            }
            Token::BadString(ref s) => out.push_str(s.as_ref()),
            Token::BadUrl(ref s) => {
                out.push_str("url(");
                out.push_str(s.as_ref());
                out.push(')');
            }
            Token::CloseParenthesis => out.push(')'),
            Token::CloseSquareBracket => out.push(']'),
            Token::CloseCurlyBracket => out.push('}'),
            _ => {}
        }
    }
}

fn rewrite_function_args(parser: &mut Parser<'_, '_>, base: &str, out: &mut String) {
    let _ = parser.parse_nested_block(|inner| -> Result<(), ()> {
        loop {
            let tok = match inner.next_including_whitespace_and_comments() {
                Ok(t) => t.clone(),
                Err(_) => break,
            };
            match tok {
                Token::QuotedString(ref s) => {
                    out.push_str(&format!("\"{}\"", escape_css_string(&rewrite_url(s.as_ref(), base))));
                }
                Token::UnquotedUrl(ref s) => {
                    out.push_str(&quote_css_url(&rewrite_url(s.as_ref(), base)));
                }
                Token::Function(ref name) if name.eq_ignore_ascii_case("url") => {
                    out.push_str("url(");
                    rewrite_function_args(inner, base, out);
                    out.push(')');
                }
                Token::WhiteSpace(_) => out.push(' '),
                Token::Comma => out.push(','),
                Token::Number { value, .. } => out.push_str(&format_number(value)),
                Token::Dimension { value, ref unit, .. } => {
                    out.push_str(&format_number(value));
                    out.push_str(unit.as_ref());
                }
                Token::Ident(ref v) => out.push_str(v.as_ref()),
                Token::Delim(c) => out.push(c),
                _ => {}
            }
        }
        Ok(())
    });
}

fn quote_css_url(url: &str) -> String {
    format!("\"{}\"", escape_css_string(url))
}

fn escape_css_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\a ")
}

fn format_number(v: f32) -> String {
    if v == (v as i64) as f32 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    const BASE: &str = "https://ex.com/style/";

    #[test]
    fn rewrites_url_function() {
        let css = r#"body { background: url(https://ex.com/bg.png); }"#;
        let result = rewrite_css(css, BASE);
        assert!(result.contains(&format!("/p/{}", codec::encode("https://ex.com/bg.png"))));
    }

    #[test]
    fn rewrites_import_with_quoted_string() {
        let css = r#"@import "https://ex.com/reset.css";"#;
        let result = rewrite_css(css, BASE);
        assert!(result.contains(&format!("/p/{}", codec::encode("https://ex.com/reset.css"))));
    }

    #[test]
    fn rewrites_import_url_function() {
        let css = r#"@import url("reset.css");"#;
        let result = rewrite_css(css, BASE);
        assert!(result.contains(&format!("/p/{}", codec::encode("https://ex.com/style/reset.css"))));
    }

    #[test]
    fn preserves_data_urls() {
        let css = r#"body { background: url(data:image/png;base64,abc); }"#;
        let result = rewrite_css(css, BASE);
        assert!(result.contains("data:image/png;base64,abc"));
    }

    #[test]
    fn protocol_relative_resolves_to_https_before_encoding() {
        let css = r#"body { background: url(//cdn.ex.com/bg.png); }"#;
        let result = rewrite_css(css, BASE);
        assert!(result.contains(&format!("/p/{}", codec::encode("https://cdn.ex.com/bg.png"))));
    }

    #[test]
    fn idempotent_on_already_proxied_urls() {
        let first = rewrite_css(r#"a { background: url(https://ex.com/bg.png); }"#, BASE);
        let second = rewrite_css(&first, BASE);
        assert_eq!(first, second);
    }
}
