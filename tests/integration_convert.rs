//! End-to-end conversion tests against a real browser

use std::sync::Once;

use svgclip::{convert, ConversionRequest, Page, PageConfig};
use tiny_http::{Header, Response, Server};

static INIT: Once = Once::new();

const PAGE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Fixture</title><style>body { margin: 0; }</style></head>
<body>
<img src="logo.svg" width="100" height="50">
<img src="badge.svg" width="20" height="20">
</body>
</html>"#;

const LOGO_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="50"><rect width="100" height="50" fill="#3264c8"/></svg>"##;

const BADGE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="20"><circle cx="10" cy="10" r="10" fill="#c83232"/></svg>"##;

/// Start a simple test HTTP server serving the fixture document
fn start_test_server() -> String {
    INIT.call_once(|| {
        std::thread::spawn(|| {
            let server = Server::http("127.0.0.1:18091").unwrap();
            for request in server.incoming_requests() {
                let (body, content_type) = match request.url() {
                    "/" => (PAGE_HTML, "text/html; charset=utf-8"),
                    "/logo.svg" => (LOGO_SVG, "image/svg+xml"),
                    "/badge.svg" => (BADGE_SVG, "image/svg+xml"),
                    _ => ("Not Found", "text/plain"),
                };
                let response = Response::from_string(body).with_header(
                    format!("Content-Type: {}", content_type)
                        .parse::<Header>()
                        .unwrap(),
                );
                let _ = request.respond(response);
            }
        });
        // Give the server time to start
        std::thread::sleep(std::time::Duration::from_millis(100));
    });

    "http://127.0.0.1:18091/".to_string()
}

fn assert_is_png(path: &std::path::Path) {
    let data = std::fs::read(path).unwrap_or_else(|e| panic!("missing {}: {}", path.display(), e));
    assert!(data.len() > 100, "PNG data seems too small");
    assert_eq!(&data[0..8], b"\x89PNG\r\n\x1a\n");
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_convert_writes_one_png_per_image() {
    let source = start_test_server();
    let dest = tempfile::tempdir().expect("Failed to create dest dir");

    let request = ConversionRequest::new(source, dest.path(), "", 2.0).unwrap();
    let mut page = svgclip::new_page(PageConfig::default()).expect("Failed to create page");

    let regions = convert(&mut page, &request).expect("Conversion failed");

    let names: Vec<&str> = regions.iter().map(|r| r.output_name.as_str()).collect();
    assert_eq!(names, ["logo.png", "badge.png"]);
    assert_is_png(&dest.path().join("logo.png"));
    assert_is_png(&dest.path().join("badge.png"));

    // scale 2 doubles every geometric value of the 100x50 logo
    assert_eq!(regions[0].width, 200.0);
    assert_eq!(regions[0].height, 100.0);

    page.close().unwrap();
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_suffix_lands_before_the_extension() {
    let source = start_test_server();
    let dest = tempfile::tempdir().expect("Failed to create dest dir");

    let request = ConversionRequest::new(source, dest.path(), "@2x", 1.0).unwrap();
    let mut page = svgclip::new_page(PageConfig::default()).expect("Failed to create page");

    let regions = convert(&mut page, &request).expect("Conversion failed");

    assert_eq!(regions[0].output_name, "logo@2x.png");
    assert_is_png(&dest.path().join("logo@2x.png"));
    assert_is_png(&dest.path().join("badge@2x.png"));

    page.close().unwrap();
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_load_failure_writes_nothing() {
    let dest = tempfile::tempdir().expect("Failed to create dest dir");

    // Nothing listens on the discard port; navigation cannot succeed.
    let request =
        ConversionRequest::new("http://127.0.0.1:9/nope.html", dest.path(), "", 1.0).unwrap();
    let config = PageConfig {
        load_timeout_ms: 5000,
        ..Default::default()
    };
    let mut page = svgclip::new_page(config).expect("Failed to create page");

    let result = convert(&mut page, &request);
    assert!(result.is_err(), "expected a load failure");
    assert_eq!(
        std::fs::read_dir(dest.path()).unwrap().count(),
        0,
        "no files may be written on load failure"
    );

    page.close().unwrap();
}
