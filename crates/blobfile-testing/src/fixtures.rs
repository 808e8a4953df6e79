//! Common test fixtures for blobfile testing

/// Multi-line text with a trailing newline
pub const LOREM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit.
Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.
Ut enim ad minim veniam, quis nostrud exercitation ullamco laboris.
Duis aute irure dolor in reprehenderit in voluptate velit esse.
Excepteur sint occaecat cupidatat non proident, sunt in culpa.
";

/// [`LOREM`] split into lines, terminators kept
pub fn lorem_lines() -> Vec<String> {
    LOREM.split_inclusive('\n').map(str::to_string).collect()
}

/// Every byte value once, in order
pub fn binary_payload() -> Vec<u8> {
    (0..=255u8).collect()
}

/// [`binary_payload`] doubled ten times (256 KiB)
pub fn large_binary_payload() -> Vec<u8> {
    let mut payload = binary_payload();
    for _ in 0..10 {
        payload.extend_from_within(..);
    }
    payload
}

/// Text that needs more than one byte per character in UTF-8
pub const MULTIBYTE: &str = "Grüße aus Zürich, naïve café, 東京\n";
