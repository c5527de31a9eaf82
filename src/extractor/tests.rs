use super::*;

#[test]
fn one_section_per_heading_in_document_order() {
    let html = r#"
        <html>
            <body>
                <h1>Intro</h1>
                <p>First section text.</p>
                <h2>Details</h2>
                <p>Second section text.</p>
                <span>More detail.</span>
                <h2>Summary</h2>
                <p>Third section text.</p>
            </body>
        </html>
    "#;

    let sections = extract_sections(html, "https://example.com/page");

    assert_eq!(sections.len(), 3);
    assert_eq!(sections[0].heading, "Intro");
    assert_eq!(sections[0].content, "First section text.");
    assert_eq!(sections[0].section_type, "h1");
    assert_eq!(sections[1].heading, "Details");
    assert_eq!(sections[1].content, "Second section text. More detail.");
    assert_eq!(sections[1].section_type, "h2");
    assert_eq!(sections[2].heading, "Summary");
    assert_eq!(sections[2].content, "Third section text.");

    for section in &sections {
        assert_eq!(section.source_id, "https://example.com/page");
    }
}

#[test]
fn section_content_stops_at_next_heading() {
    let html = r#"
        <body>
            <h1>Alpha</h1>
            <p>Alpha body.</p>
            <h1>Beta</h1>
            <p>Beta body.</p>
        </body>
    "#;

    let sections = extract_sections(html, "src");

    assert_eq!(sections.len(), 2);
    assert!(!sections[0].content.contains("Beta"));
    assert!(!sections[1].content.contains("Alpha"));
}

#[test]
fn heading_without_content_is_skipped() {
    let html = r#"
        <body>
            <h1>Empty Heading</h1>
            <h2>Real Heading</h2>
            <p>Some text.</p>
        </body>
    "#;

    let sections = extract_sections(html, "src");

    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].heading, "Real Heading");
}

#[test]
fn strips_non_content_elements() {
    let html = r#"
        <html>
            <body>
                <nav>Navigation links</nav>
                <header>Site header</header>
                <h1>Title</h1>
                <p>Body text.</p>
                <script>var tracking = true;</script>
                <footer>Copyright</footer>
            </body>
        </html>
    "#;

    let sections = extract_sections(html, "src");

    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].content, "Body text.");
    let all_text = sections
        .iter()
        .map(|s| format!("{} {}", s.heading, s.content))
        .collect::<Vec<_>>()
        .join(" ");
    assert!(!all_text.contains("Navigation"));
    assert!(!all_text.contains("tracking"));
    assert!(!all_text.contains("Copyright"));
}

#[test]
fn prefers_main_region_over_body() {
    let html = r#"
        <body>
            <div>Outside text that should be ignored.</div>
            <main>
                <h1>Inside</h1>
                <p>Main region text.</p>
            </main>
        </body>
    "#;

    let sections = extract_sections(html, "src");

    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].heading, "Inside");
    assert_eq!(sections[0].content, "Main region text.");
}

#[test]
fn paragraph_fallback_without_headings() {
    let html = r#"
        <body>
            <p>First paragraph.</p>
            <p>Second paragraph.</p>
        </body>
    "#;

    let sections = extract_sections(html, "src");

    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].heading, "Main Content");
    assert_eq!(sections[0].section_type, "body");
    assert!(sections[0].content.contains("First paragraph."));
    assert!(sections[0].content.contains("Second paragraph."));
}

#[test]
fn whole_text_fallback_without_block_elements() {
    let html = r#"
        <body>
            <ul><li>Alpha item</li><li>Beta item</li></ul>
        </body>
    "#;

    let sections = extract_sections(html, "src");

    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].heading, "Page Content");
    assert_eq!(sections[0].section_type, "body");
    assert_eq!(sections[0].content, "Alpha item Beta item");
}

#[test]
fn empty_document_yields_no_sections() {
    assert!(extract_sections("", "src").is_empty());
    assert!(extract_sections("<html><body></body></html>", "src").is_empty());
}

#[test]
fn script_only_document_yields_no_sections() {
    let html = "<html><body><script>var x = 1;</script><style>p { color: red; }</style></body></html>";
    assert!(extract_sections(html, "src").is_empty());
}

#[test]
fn malformed_markup_is_tolerated() {
    let html = "<h1>Broken<p>Unclosed paragraph<div>Stray text";

    // The parser recovers what it can; the only requirement is that the
    // call neither panics nor errors.
    let sections = extract_sections(html, "src");
    assert!(sections.iter().all(|s| !s.heading.is_empty()));
}

#[test]
fn collapses_internal_whitespace() {
    let html = "<body><h1>Title</h1><p>Spaced \n\n   out\ttext.</p></body>";

    let sections = extract_sections(html, "src");

    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].content, "Spaced out text.");
}
