use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Course descriptions and question text arrive as client-authored rich text
/// and are rendered verbatim by the web client, so they are sanitized on the
/// way in. This employs a whitelist-based strategy: safe tags (like <b>, <p>)
/// survive while dangerous tags (like <script>, <iframe>) and malicious
/// attributes (like onclick) are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
