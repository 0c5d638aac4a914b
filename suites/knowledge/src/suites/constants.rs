pub const SAMPLE_ARTICLE_HTML: &str = "<h1>Title</h1><p>Body text.</p>";

pub const SAMPLE_DOCUMENT_NAME: &str = "integration-probe.md";
pub const SAMPLE_DOCUMENT_MD: &str = "# Deployment Guide\n\n\
This guide walks through installing the agent, configuring credentials, and \
verifying the first sync against a running backend.\n\n\
## Prerequisites\n\n\
- A reachable backend instance\n\
- An API token with write access\n\n\
## Steps\n\n\
1. Install the package.\n\
2. Export the token.\n\
3. Run the smoke check and confirm the sync counter advances.\n";

/// Title used to find articles created by this run in the content library.
pub const ROUNDTRIP_TITLE: &str = "Harness Roundtrip Probe";

// Well-formed ids that no backend run will ever have assigned.
pub const UNKNOWN_ARTICLE_ID: &str = "000000000000000000000000";
pub const UNKNOWN_ASSET_ID: &str = "00000000-0000-0000-0000-000000000000";

pub const PLACEHOLDER_MARKERS: &[&str] = &["Lorem ipsum", "TODO:", "coming soon"];

pub const PROBE_ASSET_NAME: &str = "harness-probe.png";

/// 1x1 transparent PNG.
pub const PROBE_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x62, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];
