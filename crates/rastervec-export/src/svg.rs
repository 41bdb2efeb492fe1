//! SVG document sink.
//!
//! [`SvgDocument`] implements the pipeline's [`ShapeSink`] and builds an
//! SVG Tiny 1.2 document with the [`svg`] crate: one black 1x1 `<rect>`
//! per emitted shape, in pixel-unit coordinates that match the working
//! image.
//!
//! Optional [`SvgMetadata`] embeds `<title>` and `<desc>` elements for
//! accessibility and to help file managers identify exported files.
//!
//! This module does no I/O -- [`SvgDocument::render`] returns a `String`.

use svg::Document;
use svg::node::element::{Description, Rectangle, Title};
use svg::node::{Node, Text};

use rastervec_pipeline::{Dimensions, ShapeSink};

/// Fill colour of every emitted shape.
const SHAPE_FILL: &str = "black";

/// Metadata to embed in the SVG document.
///
/// Both fields are optional. When present, a `<title>` and/or `<desc>`
/// element is emitted immediately after the opening `<svg>` tag.
///
/// Text values are XML-escaped automatically by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title -- emitted as `<title>`.
    ///
    /// Typically the source image filename (without extension).
    pub title: Option<&'a str>,

    /// Document description -- emitted as `<desc>`.
    ///
    /// Typically a summary of the conversion parameters.
    pub description: Option<&'a str>,
}

/// An SVG document under construction.
///
/// Shapes are appended through [`ShapeSink`]; call [`render`](Self::render)
/// once emission has stopped, whether it finished or was cancelled.
///
/// # Examples
///
/// ```
/// use rastervec_export::{SvgDocument, SvgMetadata};
/// use rastervec_pipeline::{Dimensions, ShapeSink};
///
/// let dims = Dimensions { width: 800, height: 600 };
/// let metadata = SvgMetadata {
///     title: Some("scan"),
///     ..SvgMetadata::default()
/// };
/// let mut doc = SvgDocument::new(dims, &metadata);
/// doc.append_unit_square(10, 15);
/// let svg = doc.render();
/// assert!(svg.contains("<title>scan</title>"));
/// assert!(svg.contains(r#"viewBox="0 0 800 600""#));
/// assert!(svg.contains("<rect"));
/// ```
#[derive(Debug)]
pub struct SvgDocument {
    document: Document,
    dimensions: Dimensions,
    shapes: u64,
}

impl SvgDocument {
    /// Start an empty document covering `dimensions` pixels.
    #[must_use]
    pub fn new(dimensions: Dimensions, metadata: &SvgMetadata<'_>) -> Self {
        let (w, h) = (dimensions.width, dimensions.height);
        let mut document = Document::new()
            .set("version", "1.2")
            .set("baseProfile", "tiny")
            .set("width", w)
            .set("height", h)
            .set("viewBox", (0, 0, w, h));

        if let Some(title) = metadata.title {
            document = document.add(Title::new(title));
        }
        if let Some(description) = metadata.description {
            document = document.add(Description::new().add(Text::new(description)));
        }

        Self {
            document,
            dimensions,
            shapes: 0,
        }
    }

    /// Dimensions the document was created with.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Number of shapes appended so far.
    #[must_use]
    pub const fn shape_count(&self) -> u64 {
        self.shapes
    }

    /// Serialize the document, including the XML declaration.
    #[must_use]
    pub fn render(&self) -> String {
        // The svg crate omits the XML declaration, so we prepend it.
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}\n",
            self.document
        )
    }
}

impl ShapeSink for SvgDocument {
    fn append_unit_square(&mut self, x: u32, y: u32) {
        let rect = Rectangle::new()
            .set("x", x)
            .set("y", y)
            .set("width", 1)
            .set("height", 1)
            .set("fill", SHAPE_FILL);
        self.document.append(rect);
        self.shapes += 1;
    }
}
