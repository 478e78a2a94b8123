//! Composable security filters for I/O and tool traffic.
//!
//! A filter is three independent pure functions: one over raw input, one
//! over output text, one over tool requests. Filters compose sequentially
//! with [`SecurityFilter::and_then`]; composition captures no mutable
//! state, so it is associative.

use std::fmt;
use std::sync::Arc;

use crate::io::IoContext;
use crate::tools::ToolRequest;

type InputFn = Arc<dyn Fn(String, &IoContext) -> String + Send + Sync>;
type OutputFn = Arc<dyn Fn(String) -> String + Send + Sync>;
type ToolFn = Arc<dyn Fn(ToolRequest, &IoContext) -> ToolRequest + Send + Sync>;

/// A pure, composable filter applied to every input, output, and tool event
/// crossing an I/O context.
#[derive(Clone)]
pub struct SecurityFilter {
    input: InputFn,
    output: OutputFn,
    tool: ToolFn,
}

impl SecurityFilter {
    /// Builds a filter from its three component functions.
    pub fn new<I, O, T>(input: I, output: O, tool: T) -> Self
    where
        I: Fn(String, &IoContext) -> String + Send + Sync + 'static,
        O: Fn(String) -> String + Send + Sync + 'static,
        T: Fn(ToolRequest, &IoContext) -> ToolRequest + Send + Sync + 'static,
    {
        Self {
            input: Arc::new(input),
            output: Arc::new(output),
            tool: Arc::new(tool),
        }
    }

    /// The pass-through filter. Used as the default on every context.
    pub fn identity() -> Self {
        Self::new(|raw, _io| raw, |text| text, |request, _io| request)
    }

    /// Composes two filters: `self` applies first, then `other`.
    pub fn and_then(&self, other: &SecurityFilter) -> SecurityFilter {
        let (first_in, second_in) = (Arc::clone(&self.input), Arc::clone(&other.input));
        let (first_out, second_out) = (Arc::clone(&self.output), Arc::clone(&other.output));
        let (first_tool, second_tool) = (Arc::clone(&self.tool), Arc::clone(&other.tool));

        SecurityFilter {
            input: Arc::new(move |raw, io| second_in(first_in(raw, io), io)),
            output: Arc::new(move |text| second_out(first_out(text))),
            tool: Arc::new(move |request, io| second_tool(first_tool(request, io), io)),
        }
    }

    /// Applies the input function.
    pub fn apply_input(&self, raw: String, io: &IoContext) -> String {
        (self.input)(raw, io)
    }

    /// Applies the output function.
    pub fn apply_output(&self, text: String) -> String {
        (self.output)(text)
    }

    /// Applies the tool-request function.
    pub fn apply_tool(&self, request: ToolRequest, io: &IoContext) -> ToolRequest {
        (self.tool)(request, io)
    }
}

impl Default for SecurityFilter {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for SecurityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityFilter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn suffix_filter(tag: &'static str) -> SecurityFilter {
        SecurityFilter::new(
            move |raw, _io| format!("{raw}{tag}"),
            move |text| format!("{text}{tag}"),
            move |mut request, _io| {
                request.name = format!("{}{tag}", request.name);
                request
            },
        )
    }

    #[test]
    fn test_identity_passes_through() {
        let io = IoContext::queued();
        let filter = SecurityFilter::identity();
        assert_eq!(filter.apply_input("hello".to_string(), &io), "hello");
        assert_eq!(filter.apply_output("world".to_string()), "world");

        let request = ToolRequest::new("t1", "shell", json!({"command": "ls"}));
        assert_eq!(filter.apply_tool(request.clone(), &io), request);
    }

    #[test]
    fn test_and_then_applies_in_order() {
        let io = IoContext::queued();
        let composed = suffix_filter("-a").and_then(&suffix_filter("-b"));
        assert_eq!(composed.apply_input("x".to_string(), &io), "x-a-b");
        assert_eq!(composed.apply_output("y".to_string()), "y-a-b");

        let request = ToolRequest::new("t1", "shell", json!({}));
        assert_eq!(composed.apply_tool(request, &io).name, "shell-a-b");
    }

    #[test]
    fn test_composition_is_associative() {
        let io = IoContext::queued();
        let (a, b, c) = (suffix_filter("-a"), suffix_filter("-b"), suffix_filter("-c"));

        let left = a.and_then(&b).and_then(&c);
        let right = a.and_then(&b.and_then(&c));

        assert_eq!(
            left.apply_output("x".to_string()),
            right.apply_output("x".to_string())
        );
        assert_eq!(
            left.apply_input("x".to_string(), &io),
            right.apply_input("x".to_string(), &io)
        );
    }

    #[test]
    fn test_identity_is_neutral_for_composition() {
        let filter = suffix_filter("-a");
        let pre = SecurityFilter::identity().and_then(&filter);
        let post = filter.and_then(&SecurityFilter::identity());

        assert_eq!(pre.apply_output("x".to_string()), "x-a");
        assert_eq!(post.apply_output("x".to_string()), "x-a");
    }
}
