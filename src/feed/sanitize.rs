use ammonia::Builder;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Links, images and paragraphs only. Script and style content is dropped
/// outright; any other tag is unwrapped to its text.
static SANITIZER: LazyLock<Builder<'static>> = LazyLock::new(|| {
    let mut builder = Builder::empty();
    builder
        .add_tags(["a", "img", "p"])
        .add_tag_attributes("a", ["href", "title"])
        .add_tag_attributes("img", ["src"])
        .url_schemes(HashSet::from(["http", "https", "mailto"]))
        .clean_content_tags(HashSet::from(["script", "style", "iframe", "object", "template"]))
        .link_rel(None);
    builder
});

/// Clean an HTML fragment down to links, images and paragraphs.
///
/// Escaped ampersands are restored at the end so query strings in links
/// keep working.
pub fn sanitize_html(input: &str) -> String {
    SANITIZER.clean(input).to_string().replace("&amp;", "&")
}
