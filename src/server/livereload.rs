//! Browser side of live reload

/// Route serving [`CLIENT_SCRIPT`]
pub const SCRIPT_PATH: &str = "/__livereload.js";
/// Server-sent event stream the client subscribes to
pub const EVENTS_PATH: &str = "/__livereload";

/// Reloads the page on `reload` events and re-fetches stylesheets on `css`
/// events without a full reload.
pub const CLIENT_SCRIPT: &str = r#"(function () {
  var source = new EventSource("/__livereload");
  source.addEventListener("reload", function () {
    window.location.reload();
  });
  source.addEventListener("css", function () {
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    Array.prototype.forEach.call(links, function (link) {
      var href = link.href.replace(/[?&]livereload=\d+/, "");
      var separator = href.indexOf("?") === -1 ? "?" : "&";
      link.href = href + separator + "livereload=" + Date.now();
    });
  });
})();
"#;

fn script_tag() -> String {
    format!(r#"<script src="{}"></script>"#, SCRIPT_PATH)
}

/// Insert the client script tag before the last `</body>`, or append it when
/// the document has no body close tag
pub fn inject(html: &str) -> String {
    let tag = script_tag();
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(index) => {
            let mut injected = String::with_capacity(html.len() + tag.len());
            injected.push_str(&html[..index]);
            injected.push_str(&tag);
            injected.push_str(&html[index..]);
            injected
        }
        None => format!("{}{}", html, tag),
    }
}
