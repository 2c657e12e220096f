//! Dynamic content unrolling.
//!
//! Scrolls the primary scrollable region one viewport at a time so lazy
//! content mounts, then expands constrained scroll containers so a single
//! full-page capture covers everything.

use serde::Deserialize;
use serde_json::Value;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, trace, warn};

use crate::error::CaptureError;
use crate::renderer::config::{
    MAX_SCROLL_STEPS, MIN_SCROLL_REGION, NETWORK_IDLE_POLL, NETWORK_IDLE_TIMEOUT,
    SCROLL_SETTLE_PAUSE, SCROLL_STEP_PAUSE, UNROLL_RELAYOUT_PAUSE,
};
use crate::renderer::context::RenderContext;

/// Picks the primary scrollable region and remembers it in-page.
///
/// A candidate element qualifies if its overflow-y is scrollable, its
/// scrollable extent exceeds its visible extent, and its visible extent is
/// at least the minimum region height. The candidate with the largest
/// scrollable extent wins, unless the whole document scrolls further, in
/// which case the window is the target.
const SELECT_TARGET_JS: &str = "\
    const minRegion = arguments[0]; \
    delete window.__wsScroller; \
    let best = null; \
    let bestExtent = 0; \
    for (const el of document.querySelectorAll('*')) { \
        const style = window.getComputedStyle(el); \
        if (style.overflowY !== 'scroll' && style.overflowY !== 'auto') continue; \
        if (el.scrollHeight <= el.clientHeight) continue; \
        if (el.clientHeight < minRegion) continue; \
        if (el.scrollHeight > bestExtent) { bestExtent = el.scrollHeight; best = el; } \
    } \
    const docExtent = Math.max( \
        document.body ? document.body.scrollHeight : 0, \
        document.documentElement.scrollHeight); \
    if (best && docExtent <= bestExtent) { \
        window.__wsScroller = best; \
        return { target: 'element', extent: bestExtent, viewport: best.clientHeight }; \
    } \
    return { target: 'window', extent: docExtent, viewport: window.innerHeight };";

const SCROLL_STEP_JS: &str = "\
    const position = arguments[0]; \
    const el = window.__wsScroller; \
    if (el) { el.scrollTop = position; return el.scrollHeight; } \
    window.scrollTo(0, position); \
    return Math.max( \
        document.body ? document.body.scrollHeight : 0, \
        document.documentElement.scrollHeight);";

const MEASURE_EXTENT_JS: &str = "\
    const el = window.__wsScroller; \
    if (el) return el.scrollHeight; \
    return Math.max( \
        document.body ? document.body.scrollHeight : 0, \
        document.documentElement.scrollHeight);";

const RESET_SCROLL_JS: &str = "\
    const el = window.__wsScroller; \
    if (el) { el.scrollTop = 0; } else { window.scrollTo(0, 0); } \
    return true;";

/// Forces the element target and any size-constrained ancestor to natural
/// height and visible overflow, so the document itself grows to include
/// all content. Full-page capture only scrolls the document, not nested
/// scroll containers.
const UNROLL_CONTAINER_JS: &str = "\
    const el = window.__wsScroller; \
    if (!el) return false; \
    el.style.height = 'auto'; \
    el.style.maxHeight = 'none'; \
    el.style.overflow = 'visible'; \
    el.style.overflowY = 'visible'; \
    let parent = el.parentElement; \
    while (parent && parent !== document.body && parent !== document.documentElement) { \
        const style = window.getComputedStyle(parent); \
        if (style.height !== 'auto' || style.overflow !== 'visible') { \
            parent.style.height = 'auto'; \
            parent.style.maxHeight = 'none'; \
            parent.style.overflow = 'visible'; \
        } \
        parent = parent.parentElement; \
    } \
    return true;";

const RESOURCE_COUNT_JS: &str = "return performance.getEntriesByType('resource').length;";

#[derive(Debug, Deserialize)]
struct ScrollTarget {
    target: String,
    extent: f64,
    viewport: f64,
}

/// Termination bookkeeping for the scroll loop: the current offset plus
/// the last two observed scrollable-extent measurements.
#[derive(Debug)]
struct ScrollState {
    position: f64,
    step: f64,
    previous_extent: f64,
    extent: f64,
}

impl ScrollState {
    fn new(step: f64, extent: f64) -> Self {
        Self {
            position: 0.0,
            step,
            previous_extent: extent,
            extent,
        }
    }

    fn advance(&mut self) -> f64 {
        self.position += self.step;
        self.position
    }

    fn record_extent(&mut self, extent: f64) {
        self.previous_extent = self.extent;
        self.extent = extent;
    }

    fn reached_end(&self) -> bool {
        self.position >= self.extent
    }

    /// True once the latest measurement shows no growth over the previous
    /// one: two consecutive equal (or shrinking) extents end the loop.
    fn settled(&self) -> bool {
        self.extent <= self.previous_extent
    }
}

/// Waits for network quiescence: polls the page's resource-timing entry
/// count until two consecutive measurements are equal or the bound
/// expires. Timeout is non-fatal.
pub async fn wait_for_network_idle(context: &RenderContext) {
    let deadline = Instant::now() + NETWORK_IDLE_TIMEOUT;
    let mut last_count: Option<u64> = None;

    loop {
        let count = match context.execute(RESOURCE_COUNT_JS, vec![]).await {
            Ok(value) => value.as_u64(),
            Err(e) => {
                warn!("Resource count probe failed, skipping network idle wait: {}", e);
                return;
            }
        };
        if count.is_some() && count == last_count {
            trace!("Network idle at {} resources", count.unwrap_or(0));
            return;
        }
        last_count = count;
        if Instant::now() >= deadline {
            warn!("Network idle timeout after {:?}, proceeding anyway", NETWORK_IDLE_TIMEOUT);
            return;
        }
        sleep(NETWORK_IDLE_POLL).await;
    }
}

/// Triggers and waits out lazy-loaded content, then expands the scroll
/// container. Every failure mode here is non-fatal: the capture proceeds
/// with whatever content has rendered.
pub async fn unroll(context: &RenderContext) {
    wait_for_network_idle(context).await;

    let target = match select_target(context).await {
        Ok(target) => target,
        Err(e) => {
            warn!("Scroll target detection failed, falling back to document scrolling: {}", e);
            match fallback_window_target(context).await {
                Some(target) => target,
                None => return,
            }
        }
    };

    let scrolling_element = target.target == "element";
    debug!(
        "Scrolling {} (extent: {}, viewport: {})",
        if scrolling_element { "container" } else { "window" },
        target.extent,
        target.viewport
    );
    if target.viewport <= 0.0 || target.extent <= 0.0 {
        debug!("Degenerate scroll geometry, skipping unroll");
        return;
    }

    let mut state = ScrollState::new(target.viewport, target.extent);
    let mut steps = 0u32;

    loop {
        if steps >= MAX_SCROLL_STEPS {
            warn!(
                "Scroll cap of {} steps reached, capturing partial content",
                MAX_SCROLL_STEPS
            );
            break;
        }
        steps += 1;

        let position = state.advance();
        match execute_f64(context, SCROLL_STEP_JS, vec![position.into()]).await {
            Some(extent) => state.record_extent(extent),
            None => break,
        }
        sleep(SCROLL_STEP_PAUSE).await;

        // Lazy content mounted during the pause may have grown the page
        if let Some(extent) = execute_f64(context, MEASURE_EXTENT_JS, vec![]).await {
            state.record_extent(extent);
        }

        if state.reached_end() {
            sleep(SCROLL_SETTLE_PAUSE).await;
            match execute_f64(context, MEASURE_EXTENT_JS, vec![]).await {
                Some(extent) => state.record_extent(extent),
                None => break,
            }
            if state.settled() {
                trace!("Scroll extent settled at {}", state.extent);
                break;
            }
        }
    }

    if let Err(e) = context.execute(RESET_SCROLL_JS, vec![]).await {
        warn!("Failed to reset scroll position: {}", e);
    }

    if scrolling_element {
        debug!("Unrolling scroll container for full-page capture");
        match context.execute(UNROLL_CONTAINER_JS, vec![]).await {
            Ok(_) => sleep(UNROLL_RELAYOUT_PAUSE).await,
            Err(e) => warn!("Failed to unroll scroll container: {}", e),
        }
    }
}

async fn select_target(context: &RenderContext) -> Result<ScrollTarget, CaptureError> {
    let value = context
        .execute(SELECT_TARGET_JS, vec![Value::from(MIN_SCROLL_REGION)])
        .await?;
    serde_json::from_value(value)
        .map_err(|e| CaptureError::session(format!("malformed scroll target result: {e}")))
}

/// Document-level fallback when element detection fails.
async fn fallback_window_target(context: &RenderContext) -> Option<ScrollTarget> {
    let extent = execute_f64(context, MEASURE_EXTENT_JS, vec![]).await?;
    let viewport =
        execute_f64(context, "return window.innerHeight;", vec![]).await?;
    Some(ScrollTarget {
        target: "window".to_string(),
        extent,
        viewport,
    })
}

/// Evaluates a script expected to return a number; evaluation failures
/// are logged and collapse to None so the unroll loop can bail out.
async fn execute_f64(context: &RenderContext, script: &str, args: Vec<Value>) -> Option<f64> {
    match context.execute(script, args).await {
        Ok(value) => value.as_f64(),
        Err(e) => {
            warn!("Scroll step evaluation failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_ends_after_two_equal_extent_measurements() {
        let mut state = ScrollState::new(900.0, 2000.0);
        // Scroll to 900, 1800, 2700 while the page stops growing at 2000
        state.advance();
        state.record_extent(2000.0);
        assert!(!state.reached_end());
        state.advance();
        state.record_extent(2000.0);
        assert!(!state.reached_end());
        state.advance();
        state.record_extent(2000.0);
        assert!(state.reached_end());
        // Settle re-measure shows no growth: terminate
        state.record_extent(2000.0);
        assert!(state.settled());
    }

    #[test]
    fn growing_extent_keeps_the_loop_alive() {
        let mut state = ScrollState::new(900.0, 1000.0);
        state.advance(); // 900
        state.record_extent(1000.0);
        state.advance(); // 1800 >= 1000
        state.record_extent(1000.0);
        assert!(state.reached_end());
        // Settle wait reveals newly mounted content
        state.record_extent(2600.0);
        assert!(!state.settled());
        state.advance(); // 2700 >= 2600
        state.record_extent(2600.0);
        assert!(state.reached_end());
        state.record_extent(2600.0);
        assert!(state.settled());
    }

    #[test]
    fn shrinking_extent_counts_as_settled() {
        let mut state = ScrollState::new(500.0, 1200.0);
        state.advance();
        state.advance();
        state.advance();
        state.record_extent(1200.0);
        assert!(state.reached_end());
        state.record_extent(1100.0);
        assert!(state.settled());
    }
}
