//! Wraps rewritten content into a complete, self-contained print document.
//!
//! The preview markup stays layout-agnostic; the fixed-page constraints
//! (A4 sizing, page breaks, density overrides, watermark) are only applied
//! here, at render time.

const FONT_STYLESHEET: &str =
    "https://fonts.googleapis.com/css2?family=Poppins:wght@300;400;500;600;700&display=swap";

const PRINT_RULES: &str = r#"@page { size: A4; margin: 0; }
html, body {
  margin: 0;
  padding: 0;
  background: #ffffff;
  -webkit-print-color-adjust: exact;
  print-color-adjust: exact;
}
@media print {
  .no-print, .preview-toolbar, button { display: none !important; }
  .print-page { page-break-after: always; break-after: page; }
  .print-page:last-child { page-break-after: auto; break-after: auto; }
  tr, .line-item { page-break-inside: avoid; break-inside: avoid; }
  thead { display: table-header-group; }
}"#;

/// Layout overrides for one document section class.
#[derive(Debug, Clone, Copy)]
pub struct SectionOverride {
    pub class: &'static str,
    pub padding: &'static str,
    pub font_size: &'static str,
    pub watermark: bool,
}

/// Overrides for every document kind the generators emit.
pub const SECTION_OVERRIDES: &[SectionOverride] = &[
    SectionOverride {
        class: "quotation-page",
        padding: "10mm 12mm",
        font_size: "11px",
        watermark: true,
    },
    SectionOverride {
        class: "invoice-page",
        padding: "8mm 10mm",
        font_size: "11px",
        watermark: true,
    },
    SectionOverride {
        class: "waybill-page",
        padding: "6mm 8mm",
        font_size: "10px",
        watermark: false,
    },
    SectionOverride {
        class: "worksheet-page",
        padding: "8mm 10mm",
        font_size: "10.5px",
        watermark: false,
    },
    SectionOverride {
        class: "service-page",
        padding: "8mm 10mm",
        font_size: "11px",
        watermark: true,
    },
    SectionOverride {
        class: "stock-report-page",
        padding: "6mm 8mm",
        font_size: "9.5px",
        watermark: false,
    },
];

/// Inputs for one assembled document.
#[derive(Debug, Clone, Copy)]
pub struct DocumentParts<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub styles: &'a str,
    /// Embedded reference used as the background watermark.
    pub watermark: &'a str,
}

/// Pure string composition of the final HTML document.
#[derive(Debug, Clone)]
pub struct DocumentAssembler {
    overrides: &'static [SectionOverride],
}

impl Default for DocumentAssembler {
    fn default() -> Self {
        Self::new(SECTION_OVERRIDES)
    }
}

impl DocumentAssembler {
    pub fn new(overrides: &'static [SectionOverride]) -> Self {
        Self { overrides }
    }

    pub fn assemble(&self, parts: DocumentParts<'_>) -> String {
        let mut html = String::with_capacity(
            parts.content.len() + parts.styles.len() + parts.watermark.len() * 2 + 4096,
        );

        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        html.push_str("<meta charset=\"UTF-8\">\n");
        html.push_str(
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
        );
        html.push_str(&format!("<title>{}</title>\n", escape_html(parts.title)));
        html.push_str("<link rel=\"preconnect\" href=\"https://fonts.googleapis.com\">\n");
        html.push_str("<link rel=\"preconnect\" href=\"https://fonts.gstatic.com\" crossorigin>\n");
        html.push_str(&format!(
            "<link rel=\"stylesheet\" href=\"{FONT_STYLESHEET}\">\n"
        ));
        html.push_str("<style>\n");
        html.push_str(parts.styles);
        html.push_str("\n</style>\n<style>\n");
        html.push_str(PRINT_RULES);
        html.push('\n');
        html.push_str(&self.section_rules(parts.watermark));
        html.push_str("</style>\n</head>\n<body>\n");
        html.push_str(parts.content);
        html.push_str("\n</body>\n</html>\n");

        html
    }

    fn section_rules(&self, watermark: &str) -> String {
        let mut css = String::new();
        for section in self.overrides {
            css.push_str(&format!(
                ".{class} {{ width: 210mm; height: 297mm; box-sizing: border-box; overflow: hidden; \
                 padding: {padding}; font-size: {font_size}; position: relative; margin: 0 auto; }}\n",
                class = section.class,
                padding = section.padding,
                font_size = section.font_size,
            ));
            css.push_str(&format!(
                ".{class} table {{ width: 100%; border-collapse: collapse; }}\n\
                 .{class} td, .{class} th {{ padding: 2px 4px; line-height: 1.25; }}\n",
                class = section.class,
            ));
            if section.watermark && !watermark.is_empty() {
                css.push_str(&format!(
                    ".{class} {{ background-image: url(\"{watermark}\"); background-repeat: no-repeat; \
                     background-position: center; background-size: 60%; }}\n",
                    class = section.class,
                ));
            }
        }
        css
    }
}

/// Minimal escaping for text placed inside HTML elements.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
