//! Replaces references to known asset files with embedded data URIs.
//!
//! Generators emit ordinary browser paths (`../assets/logo.png`,
//! `assets\logo.png`, ...). The off-screen document is loaded from a
//! throwaway temp file, so those paths are swapped for the bundle's
//! `data:` URIs. Anything that does not match a manifest entry is left
//! exactly as it was.

use regex::{Captures, Regex};
use std::borrow::Cow;

use super::assets::{AssetBundle, AssetKey, AssetManifest};

#[derive(Debug)]
struct RewriteRule {
    key: AssetKey,
    attribute: Regex,
    /// The whole path, anchored, for matching one `srcset` candidate URL.
    candidate: Regex,
    css_url: Regex,
}

/// Compiled match patterns for every image in a manifest.
#[derive(Debug)]
pub struct ContentRewriter {
    rules: Vec<RewriteRule>,
    srcset: Regex,
}

/// `../assets/X`, `./assets/X`, `assets/X`, `/assets/X`, either separator.
fn path_pattern(file_name: &str) -> String {
    format!(
        r"(?:\.\.[/\\]|\.[/\\]|[/\\])?assets[/\\]{}",
        regex::escape(file_name)
    )
}

impl ContentRewriter {
    pub fn new(manifest: &AssetManifest) -> Result<Self, regex::Error> {
        let rules = manifest
            .images
            .iter()
            .map(|asset| {
                let path = path_pattern(asset.file_name);
                Ok(RewriteRule {
                    key: asset.key,
                    attribute: Regex::new(&format!(
                        r#"\b(data-src|src)\s*=\s*(?:"{path}"|'{path}')"#
                    ))?,
                    candidate: Regex::new(&format!("^{path}$"))?,
                    css_url: Regex::new(&format!(
                        r#"url\(\s*(?:"{path}"|'{path}'|{path})\s*\)"#
                    ))?,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            rules,
            srcset: Regex::new(r#"\bsrcset\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
        })
    }

    /// Rewrite every recognised reference in `html`. Never fails.
    pub fn rewrite(&self, html: &str, bundle: &AssetBundle) -> String {
        let mut output = Cow::Borrowed(html);

        for rule in &self.rules {
            let Some(image) = bundle.image(rule.key) else {
                continue;
            };
            let data_uri = image.data_uri.as_str();

            let replaced = owned(rule.attribute.replace_all(&output, |caps: &Captures| {
                format!(r#"{}="{}""#, &caps[1], data_uri)
            }));
            if let Some(replaced) = replaced {
                output = Cow::Owned(replaced);
            }

            let replaced = owned(self.srcset.replace_all(&output, |caps: &Captures| {
                let value = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
                match rewrite_srcset(value, &rule.candidate, data_uri) {
                    Some(value) => format!(r#"srcset="{value}""#),
                    None => caps[0].to_string(),
                }
            }));
            if let Some(replaced) = replaced {
                output = Cow::Owned(replaced);
            }

            let replaced = owned(
                rule.css_url
                    .replace_all(&output, |_: &Captures| format!(r#"url("{}")"#, data_uri)),
            );
            if let Some(replaced) = replaced {
                output = Cow::Owned(replaced);
            }
        }

        output.into_owned()
    }
}

/// Swap every candidate URL in a `srcset` value that matches `candidate`,
/// keeping separators and descriptors. `None` when nothing matched.
fn rewrite_srcset(value: &str, candidate: &Regex, data_uri: &str) -> Option<String> {
    let mut out = String::with_capacity(value.len());
    let mut changed = false;
    let mut rest = value;

    loop {
        let url_start = rest
            .find(|c: char| !c.is_whitespace() && c != ',')
            .unwrap_or(rest.len());
        out.push_str(&rest[..url_start]);
        rest = &rest[url_start..];
        if rest.is_empty() {
            break;
        }

        let url_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let url = rest[..url_end].trim_end_matches(',');
        if candidate.is_match(url) {
            out.push_str(data_uri);
            changed = true;
        } else {
            out.push_str(url);
        }
        rest = &rest[url.len()..];

        let descriptor_end = rest.find(',').unwrap_or(rest.len());
        out.push_str(&rest[..descriptor_end]);
        rest = &rest[descriptor_end..];
    }

    changed.then_some(out)
}

/// `Some` only when a replacement actually happened.
fn owned(text: Cow<'_, str>) -> Option<String> {
    match text {
        Cow::Owned(replaced) => Some(replaced),
        Cow::Borrowed(_) => None,
    }
}
