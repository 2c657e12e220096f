//! Content bounds analysis for smart cropping.
//!
//! A single in-page evaluation walks the rendered document and reports the
//! union rectangle of everything that carries a visual-content signal, in
//! document-absolute CSS pixels. Padding expansion and origin clamping
//! happen on the Rust side.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::renderer::context::RenderContext;
use crate::renderer::model::ContentBounds;

/// Walks elements and text nodes, accumulating the min/max edges of every
/// contributing rectangle.
///
/// An element contributes if it is rendered (displayed, visible, opaque),
/// is not a background wrapper (box within 50px of both viewport
/// dimensions), has positive area, and shows at least one visual-content
/// signal: a non-transparent background color, a background image, a
/// visible border, a box shadow, or an inherently visual tag. Text nodes
/// are measured through a Range so text inside otherwise-unstyled
/// containers still contributes.
const CONTENT_BOUNDS_JS: &str = "\
    if (!document.body) return { found: false }; \
    const vw = window.innerWidth; \
    const vh = window.innerHeight; \
    const scrollX = window.scrollX; \
    const scrollY = window.scrollY; \
    \
    function isBackgroundWrapper(el) { \
        const rect = el.getBoundingClientRect(); \
        const isFullWidth = Math.abs(rect.width - vw) < 50; \
        const isFullHeight = Math.abs(rect.height - vh) < 50; \
        return isFullWidth && isFullHeight; \
    } \
    \
    function hasVisualContent(el, style) { \
        const bgColor = style.backgroundColor; \
        if (bgColor && bgColor !== 'transparent' && !bgColor.includes('rgba(0, 0, 0, 0)')) return true; \
        if (style.backgroundImage && style.backgroundImage !== 'none') return true; \
        if (style.borderWidth && style.borderWidth !== '0px' && style.borderColor !== 'transparent') return true; \
        if (style.boxShadow && style.boxShadow !== 'none') return true; \
        const visualTags = ['IMG', 'VIDEO', 'CANVAS', 'SVG', 'INPUT', 'BUTTON', 'TEXTAREA', 'SELECT', 'HR', 'IFRAME']; \
        return visualTags.includes(el.tagName); \
    } \
    \
    let minX = Infinity, minY = Infinity, maxX = -Infinity, maxY = -Infinity; \
    let found = false; \
    \
    function accumulate(rect) { \
        found = true; \
        minX = Math.min(minX, rect.left + scrollX); \
        minY = Math.min(minY, rect.top + scrollY); \
        maxX = Math.max(maxX, rect.right + scrollX); \
        maxY = Math.max(maxY, rect.bottom + scrollY); \
    } \
    \
    const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_ELEMENT); \
    let node; \
    while (node = walker.nextNode()) { \
        const style = window.getComputedStyle(node); \
        if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') continue; \
        if (isBackgroundWrapper(node)) continue; \
        const rect = node.getBoundingClientRect(); \
        if (rect.width === 0 || rect.height === 0) continue; \
        if (hasVisualContent(node, style)) accumulate(rect); \
    } \
    \
    const textWalker = document.createTreeWalker(document.body, NodeFilter.SHOW_TEXT); \
    let textNode; \
    while (textNode = textWalker.nextNode()) { \
        if (!textNode.textContent.trim()) continue; \
        const parent = textNode.parentElement; \
        if (!parent) continue; \
        const parentStyle = window.getComputedStyle(parent); \
        if (parentStyle.display === 'none' || parentStyle.visibility === 'hidden' || parentStyle.opacity === '0') continue; \
        if (isBackgroundWrapper(parent)) continue; \
        const range = document.createRange(); \
        range.selectNodeContents(textNode); \
        const rect = range.getBoundingClientRect(); \
        if (rect.width === 0 || rect.height === 0) continue; \
        accumulate(rect); \
    } \
    \
    if (!found) return { found: false }; \
    return { found: true, left: minX, top: minY, right: maxX, bottom: maxY };";

#[derive(Debug, Deserialize)]
struct RawUnion {
    found: bool,
    #[serde(default)]
    left: f64,
    #[serde(default)]
    top: f64,
    #[serde(default)]
    right: f64,
    #[serde(default)]
    bottom: f64,
}

/// Computes the tight bounding box used for smart cropping.
///
/// Returns None when nothing on the page qualifies, and also when the
/// evaluation itself fails: either way the caller falls back to the
/// uncropped full-page image.
pub async fn content_bounds(context: &RenderContext, padding: u32) -> Option<ContentBounds> {
    debug!("Calculating content bounds with padding: {}px", padding);

    let value = match context.execute(CONTENT_BOUNDS_JS, vec![]).await {
        Ok(value) => value,
        Err(e) => {
            warn!("Content bounds evaluation failed, using full page: {}", e);
            return None;
        }
    };
    let raw: RawUnion = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Malformed content bounds result, using full page: {}", e);
            return None;
        }
    };
    if !raw.found {
        debug!("No qualifying visual content found, using full page");
        return None;
    }

    let bounds =
        ContentBounds::from_union(raw.left, raw.top, raw.right, raw.bottom, padding as f64);
    debug!("Content bounds: {:?}", bounds);
    Some(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_union_parses_found_result() {
        let value = serde_json::json!({
            "found": true, "left": 40.0, "top": 40.0, "right": 140.0, "bottom": 90.0
        });
        let raw: RawUnion = serde_json::from_value(value).unwrap();
        assert!(raw.found);
        let bounds = ContentBounds::from_union(raw.left, raw.top, raw.right, raw.bottom, 30.0);
        assert_eq!(bounds.x, 10.0);
        assert_eq!(bounds.width, 160.0);
    }

    #[test]
    fn raw_union_parses_empty_result() {
        let raw: RawUnion = serde_json::from_value(serde_json::json!({ "found": false })).unwrap();
        assert!(!raw.found);
    }
}
