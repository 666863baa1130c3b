//! PresentationML writer.
//!
//! Produces a minimal Open XML package: one master, one blank layout, one
//! theme and one part per slide. All text lives in explicit text boxes so no
//! placeholder inheritance is involved.

use crate::deck::{
    inches, Bullet, CodeBlock, ContentSlide, Deck, Frame, Slide, TitleSlide, MAX_FONT_SIZE, MAX_LEVEL, MIN_FONT_SIZE,
};
use crate::{Result, Rgb};
use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// 10in x 7.5in, the 4:3 default.
pub const SLIDE_WIDTH: i64 = 9_144_000;
pub const SLIDE_HEIGHT: i64 = 6_858_000;

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CT_PML: &str = "application/vnd.openxmlformats-officedocument.presentationml";

const EMPTY_GROUP: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#;

const TITLE_FRAME: Frame = Frame::new(685_800, 2_130_425, 7_772_400, 1_470_025);
const SUBTITLE_FRAME: Frame = Frame::new(1_371_600, 3_886_200, 6_400_800, 1_752_600);
const HEADING_FRAME: Frame = Frame::new(457_200, 274_638, 8_229_600, 1_143_000);
const BODY_FRAME: Frame = Frame::new(457_200, 1_600_200, 8_229_600, 4_525_963);

/// Code text size: 2% of the slide height, in hundredths of a point.
const DEFAULT_CODE_SIZE: u32 = (SLIDE_HEIGHT as u32 / 50) * 100 / 12_700;

/// One file inside the package.
#[derive(Debug, Clone)]
pub struct Part {
    pub name: String,
    pub xml: String,
}

impl Part {
    fn new(name: impl Into<String>, body: String) -> Self {
        Self {
            name: name.into(),
            xml: format!("{}\n{}", XML_DECL, body),
        }
    }
}

/// Render a deck to `.pptx` bytes.
pub fn render_pptx(deck: &Deck) -> Result<Vec<u8>> {
    let parts = package_parts(deck);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for part in &parts {
        zip.start_file(part.name.as_str(), options)?;
        zip.write_all(part.xml.as_bytes())?;
    }
    let bytes = zip.finish()?.into_inner();

    debug!("Rendered {} slides into {} bytes", deck.len(), bytes.len());
    Ok(bytes)
}

/// Render a deck and write it to `path`.
pub async fn write_pptx(deck: &Deck, path: &Path) -> Result<()> {
    let bytes = render_pptx(deck)?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Every part of the package, in archive order.
pub fn package_parts(deck: &Deck) -> Vec<Part> {
    let n = deck.slides.len();
    let background = deck.background.unwrap_or(Rgb::WHITE);

    let mut parts = vec![
        Part::new("[Content_Types].xml", content_types(n)),
        Part::new(
            "_rels/.rels",
            relationships(&[("rId1", "officeDocument", "ppt/presentation.xml")]),
        ),
        Part::new("ppt/presentation.xml", presentation(n)),
        Part::new("ppt/_rels/presentation.xml.rels", presentation_rels(n)),
        Part::new("ppt/slideMasters/slideMaster1.xml", slide_master()),
        Part::new(
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            relationships(&[
                ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                ("rId2", "theme", "../theme/theme1.xml"),
            ]),
        ),
        Part::new("ppt/slideLayouts/slideLayout1.xml", slide_layout()),
        Part::new(
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            relationships(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
        ),
        Part::new("ppt/theme/theme1.xml", theme()),
    ];

    for (i, slide) in deck.slides.iter().enumerate() {
        let number = i + 1;
        parts.push(Part::new(
            format!("ppt/slides/slide{}.xml", number),
            slide_xml(slide, background),
        ));
        parts.push(Part::new(
            format!("ppt/slides/_rels/slide{}.xml.rels", number),
            relationships(&[("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml")]),
        ));
    }

    parts
}

fn content_types(slides: usize) -> String {
    let mut xml = format!(
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="{ct}.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="{ct}.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="{ct}.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>"#,
        ct = CT_PML
    );
    for i in 1..=slides {
        xml.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="{}.slide+xml"/>"#,
            i, CT_PML
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn relationships(rels: &[(&str, &str, &str)]) -> String {
    let mut xml = format!(r#"<Relationships xmlns="{}">"#, REL_NS);
    for (id, kind, target) in rels {
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}/{}" Target="{}"/>"#,
            id, REL_TYPE, kind, target
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

// rId1 is the master, rId2.. the slides, the theme comes last.
fn presentation_rels(slides: usize) -> String {
    let targets: Vec<String> = (1..=slides).map(|i| format!("slides/slide{}.xml", i)).collect();
    let ids: Vec<String> = (0..=slides + 1).map(|i| format!("rId{}", i + 1)).collect();

    let mut rels = vec![(ids[0].as_str(), "slideMaster", "slideMasters/slideMaster1.xml")];
    for (i, target) in targets.iter().enumerate() {
        rels.push((ids[i + 1].as_str(), "slide", target.as_str()));
    }
    rels.push((ids[slides + 1].as_str(), "theme", "theme/theme1.xml"));
    relationships(&rels)
}

fn presentation(slides: usize) -> String {
    let slide_ids: String = (0..slides)
        .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 2))
        .collect();
    let slide_list = if slides == 0 {
        String::new()
    } else {
        format!("<p:sldIdLst>{}</p:sldIdLst>", slide_ids)
    };
    format!(
        r#"<p:presentation {ns} saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>{slides}<p:sldSz cx="{w}" cy="{h}" type="screen4x3"/><p:notesSz cx="{h}" cy="{w}"/></p:presentation>"#,
        ns = NS,
        slides = slide_list,
        w = SLIDE_WIDTH,
        h = SLIDE_HEIGHT
    )
}

fn slide_master() -> String {
    format!(
        r#"<p:sldMaster {ns}><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>{group}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#,
        ns = NS,
        group = EMPTY_GROUP
    )
}

fn slide_layout() -> String {
    format!(
        r#"<p:sldLayout {ns} type="blank" preserve="1"><p:cSld name="Blank"><p:spTree>{group}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#,
        ns = NS,
        group = EMPTY_GROUP
    )
}

fn theme() -> String {
    let solid = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let fills = solid.repeat(3);
    let lines: String = [9525, 25400, 38100]
        .iter()
        .map(|w| format!(r#"<a:ln w="{}">{}</a:ln>"#, w, solid))
        .collect();
    let effects = "<a:effectStyle><a:effectLst/></a:effectStyle>".repeat(3);
    let font = r#"<a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/>"#;

    format!(
        r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Slidesmith"><a:themeElements><a:clrScheme name="Slidesmith"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F497D"/></a:dk2><a:lt2><a:srgbClr val="EEECE1"/></a:lt2><a:accent1><a:srgbClr val="4F81BD"/></a:accent1><a:accent2><a:srgbClr val="C0504D"/></a:accent2><a:accent3><a:srgbClr val="9BBB59"/></a:accent3><a:accent4><a:srgbClr val="8064A2"/></a:accent4><a:accent5><a:srgbClr val="4BACC6"/></a:accent5><a:accent6><a:srgbClr val="F79646"/></a:accent6><a:hlink><a:srgbClr val="0000FF"/></a:hlink><a:folHlink><a:srgbClr val="800080"/></a:folHlink></a:clrScheme><a:fontScheme name="Slidesmith"><a:majorFont>{font}</a:majorFont><a:minorFont>{font}</a:minorFont></a:fontScheme><a:fmtScheme name="Slidesmith"><a:fillStyleLst>{fills}</a:fillStyleLst><a:lnStyleLst>{lines}</a:lnStyleLst><a:effectStyleLst>{effects}</a:effectStyleLst><a:bgFillStyleLst>{fills}</a:bgFillStyleLst></a:fmtScheme></a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>"#,
        font = font,
        fills = fills,
        lines = lines,
        effects = effects
    )
}

/// Paragraph text run properties.
struct RunStyle<'a> {
    size: u32,
    bold: bool,
    color: Rgb,
    font: Option<&'a str>,
}

impl RunStyle<'_> {
    fn rpr(&self) -> String {
        let font = self
            .font
            .map(|f| format!(r#"<a:latin typeface="{}"/>"#, escape(f)))
            .unwrap_or_default();
        format!(
            r#"<a:rPr lang="en-US" sz="{}" b="{}" dirty="0"><a:solidFill><a:srgbClr val="{}"/></a:solidFill>{}</a:rPr>"#,
            self.size,
            if self.bold { 1 } else { 0 },
            self.color.hex(),
            font
        )
    }

    fn end_rpr(&self) -> String {
        format!(r#"<a:endParaRPr lang="en-US" sz="{}" dirty="0"/>"#, self.size)
    }
}

/// Drop characters XML 1.0 cannot carry.
fn clean(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .filter(|c| *c == '\t' || !c.is_control())
        .collect()
}

fn paragraph(ppr: &str, text: &str, style: &RunStyle<'_>) -> String {
    let text = clean(text);
    if text.is_empty() {
        return format!("<a:p>{}{}</a:p>", ppr, style.end_rpr());
    }
    format!(
        "<a:p>{}<a:r>{}<a:t>{}</a:t></a:r></a:p>",
        ppr,
        style.rpr(),
        escape(text.as_str())
    )
}

fn bullet_paragraph(bullet: &Bullet, color: Rgb) -> String {
    let level = bullet.level.min(MAX_LEVEL);
    let indent = 342_900;
    let margin = indent + level as i64 * 457_200;
    let ppr = format!(
        r#"<a:pPr marL="{}" lvl="{}" indent="-{}"><a:buFont typeface="Arial"/><a:buChar char="{}"/></a:pPr>"#,
        margin,
        level,
        indent,
        if level == 0 { "\u{2022}" } else { "\u{2013}" }
    );
    let style = RunStyle {
        size: 2400u32.saturating_sub(level as u32 * 200).max(1400),
        bold: false,
        color,
        font: None,
    };
    paragraph(&ppr, &bullet.text, &style)
}

fn text_box(id: u32, name: &str, frame: Frame, paragraphs: &str, anchor: &str) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="square" rtlCol="0" anchor="{anchor}"><a:normAutofit/></a:bodyPr><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#,
        id = id,
        name = escape(name),
        x = frame.x,
        y = frame.y,
        cx = frame.cx,
        cy = frame.cy,
        anchor = anchor,
        paragraphs = paragraphs
    )
}

fn centered(text: &str, size: u32, bold: bool, color: Rgb) -> String {
    let style = RunStyle { size, bold, color, font: None };
    paragraph(r#"<a:pPr algn="ctr"><a:buNone/></a:pPr>"#, text, &style)
}

fn title_shapes(slide: &TitleSlide, color: Rgb) -> Vec<String> {
    let mut shapes = vec![text_box(
        2,
        "Title 1",
        TITLE_FRAME,
        &centered(&slide.title, 4400, true, color),
        "ctr",
    )];
    if let Some(subtitle) = &slide.subtitle {
        shapes.push(text_box(
            3,
            "Subtitle 2",
            SUBTITLE_FRAME,
            &centered(subtitle, 2400, false, color),
            "t",
        ));
    }
    shapes
}

fn code_shape(id: u32, code: &CodeBlock, color: Rgb) -> String {
    let style = RunStyle {
        size: code.font_size.unwrap_or(DEFAULT_CODE_SIZE).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE),
        bold: false,
        color,
        font: Some(&code.font),
    };
    let ppr = "<a:pPr><a:buNone/></a:pPr>";
    let paragraphs: String = code
        .text
        .trim_matches('\n')
        .lines()
        .map(|line| paragraph(ppr, line, &style))
        .collect();
    let frame = code
        .frame
        .filter(Frame::has_area)
        .unwrap_or_else(|| Frame::new(inches(1.0), inches(2.5), inches(8.0), inches(3.0)));
    text_box(id, "Code Box", frame, &paragraphs, "t")
}

fn content_shapes(slide: &ContentSlide, color: Rgb) -> Vec<String> {
    let heading = paragraph(
        "<a:pPr><a:buNone/></a:pPr>",
        &slide.title,
        &RunStyle { size: 3600, bold: true, color, font: None },
    );
    let mut shapes = vec![text_box(2, "Title 1", HEADING_FRAME, &heading, "b")];

    if !slide.bullets.is_empty() {
        let body: String = slide.bullets.iter().map(|b| bullet_paragraph(b, color)).collect();
        shapes.push(text_box(3, "Content 2", BODY_FRAME, &body, "t"));
    }
    if let Some(code) = &slide.code {
        shapes.push(code_shape(4, code, color));
    }
    shapes
}

fn slide_xml(slide: &Slide, background: Rgb) -> String {
    let text_color = if background.is_dark() { Rgb::WHITE } else { Rgb::BLACK };
    let shapes = match slide {
        Slide::Title(s) => title_shapes(s, text_color),
        Slide::Content(s) => content_shapes(s, text_color),
    };
    format!(
        r#"<p:sld {ns}><p:cSld><p:bg><p:bgPr><a:solidFill><a:srgbClr val="{bg}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg><p:spTree>{group}{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        ns = NS,
        bg = background.hex(),
        group = EMPTY_GROUP,
        shapes = shapes.concat()
    )
}
