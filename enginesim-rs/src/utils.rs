use regex::Regex;
use tokio::task::JoinError;

use crate::types::TestOutcome;

/// Converts the join result of a spawned test body into an outcome. A test
/// that returned drives its own verdict; an error becomes a failing outcome;
/// a panic is downcast to its message so the report stays readable.
pub fn outcome_from_run(
    joined: Result<anyhow::Result<TestOutcome>, JoinError>,
) -> TestOutcome {
    match joined {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => TestOutcome::fail(format!("ERROR: {err:#}")),
        Err(join_err) => {
            if !join_err.is_panic() {
                return TestOutcome::fail(format!("ERROR: test task aborted: {join_err}"));
            }
            let panic = join_err.into_panic();
            let message = if let Some(msg) = panic.downcast_ref::<&'static str>() {
                msg.to_string()
            } else if let Some(msg) = panic.downcast_ref::<String>() {
                msg.clone()
            } else {
                format!("?{panic:?}")
            };
            TestOutcome::fail(format!("PANIC: {message}"))
        }
    }
}

/// Strips an HTML document down to its visible text: script/style bodies
/// removed, block tags become line breaks, remaining tags dropped, common
/// entities decoded, whitespace collapsed.
pub fn html_to_text(html: &str) -> String {
    let script_re =
        Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("fixed regex");
    let block_re = Regex::new(r"(?i)</?(p|div|br|h[1-6]|li|tr|pre)[^>]*>").expect("fixed regex");
    let tag_re = Regex::new(r"<[^>]+>").expect("fixed regex");
    let multi_newline = Regex::new(r"\n{3,}").expect("fixed regex");
    let multi_space = Regex::new(r" {2,}").expect("fixed regex");

    let text = script_re.replace_all(html, "");
    let text = block_re.replace_all(&text, "\n");
    let text = tag_re.replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    let text = multi_newline.replace_all(&text, "\n\n");
    let text = multi_space.replace_all(&text, " ");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_strips_markup() {
        let html = "<h1>Guide</h1><p>First &amp; second.</p><script>alert(1)</script>";
        let text = html_to_text(html);
        assert!(text.contains("Guide"));
        assert!(text.contains("First & second."));
        assert!(!text.contains("alert"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_html_to_text_keeps_code_content() {
        let html = "<pre><code>let x = 1;</code></pre>";
        assert_eq!(html_to_text(html), "let x = 1;");
    }

    #[test]
    fn test_plain_text_passthrough() {
        assert_eq!(html_to_text("no markup here"), "no markup here");
    }
}
