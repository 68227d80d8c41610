//! Card body values and the `bodyHTML` interchange form.
//!
//! Built on `winnow` 0.7. Covers the small textual formats a card carries
//! (`L / R` pairs, `330/330pv` progress, CSS widths and colors, print sizes)
//! and a tolerant tag scanner that recovers structured rows from the HTML
//! body stored in project files.

use crate::error::InputError;
use crate::model::{ActivePvState, BodyRow, COIN_EMPTY, COIN_FULL, Color, Pair, RowKind};
use winnow::ascii::{Caseless, dec_uint, float, space0, space1};
use winnow::combinator::{alt, delimited, opt, preceded, repeat};
use winnow::prelude::*;
use winnow::token::{one_of, take_till, take_while};

// ─── Value formats ───────────────────────────────────────────────────────

fn pair(input: &mut &str) -> ModalResult<Pair> {
    (space0, dec_uint, space0, '/', space0, dec_uint)
        .map(|(_, left, _, _, _, right)| Pair::new(left, right))
        .parse_next(input)
}

/// Parse a leading `L / R` pair. Trailing text is ignored.
pub fn parse_pair(s: &str) -> Option<Pair> {
    let mut input = s;
    pair(&mut input).ok()
}

pub fn format_pair(p: Pair) -> String {
    format!("{} / {}", p.left, p.right)
}

/// `current/target` personal volume shown next to the coin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PvProgress {
    pub current: u32,
    pub target: u32,
}

impl PvProgress {
    pub fn is_full(&self) -> bool {
        self.target > 0 && self.current >= self.target
    }
}

fn pv_progress(input: &mut &str) -> ModalResult<PvProgress> {
    (
        space0,
        dec_uint,
        space0,
        '/',
        space0,
        dec_uint,
        space0,
        opt(Caseless("pv")),
    )
        .map(|(_, current, _, _, _, target, _, _)| PvProgress { current, target })
        .parse_next(input)
}

/// Parse `330/330pv` (the `pv` suffix is optional).
pub fn parse_pv_progress(s: &str) -> Option<PvProgress> {
    let mut input = s;
    pv_progress(&mut input).ok()
}

fn css_px(input: &mut &str) -> ModalResult<f32> {
    (space0, float, space0, opt(Caseless("px")), space0)
        .map(|(_, v, _, _, _): (_, f32, _, _, _)| v)
        .parse_next(input)
}

/// Parse a CSS pixel length such as `"494px"` or `"380"`.
pub fn parse_css_px(s: &str) -> Option<f32> {
    css_px.parse(s).ok().filter(|v: &f32| v.is_finite() && *v > 0.0)
}

// ─── Colors ──────────────────────────────────────────────────────────────

fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn color_from_hex_digits(hex: &str) -> Option<Color> {
    let b = hex.as_bytes();
    let byte = |i: usize| Some(hex_nibble(b[i])? << 4 | hex_nibble(b[i + 1])?);
    let short = |i: usize| Some(hex_nibble(b[i])? * 17);
    match b.len() {
        3 => Some(Color::rgb(short(0)?, short(1)?, short(2)?)),
        4 => Some(Color {
            r: short(0)?,
            g: short(1)?,
            b: short(2)?,
            a: short(3)?,
        }),
        6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color {
            r: byte(0)?,
            g: byte(2)?,
            b: byte(4)?,
            a: byte(6)?,
        }),
        _ => None,
    }
}

fn hex_color(input: &mut &str) -> ModalResult<Color> {
    preceded('#', take_while(3..=8, |c: char| c.is_ascii_hexdigit()))
        .verify_map(color_from_hex_digits)
        .parse_next(input)
}

fn comma(input: &mut &str) -> ModalResult<()> {
    (space0, ',', space0).void().parse_next(input)
}

fn channel(input: &mut &str) -> ModalResult<u8> {
    dec_uint
        .verify_map(|v: u32| u8::try_from(v).ok())
        .parse_next(input)
}

fn rgb_color(input: &mut &str) -> ModalResult<Color> {
    (
        Caseless("rgb"),
        opt(Caseless("a")),
        space0,
        '(',
        space0,
        channel,
        comma,
        channel,
        comma,
        channel,
        opt(preceded(comma, float)),
        space0,
        ')',
    )
        .map(|(_, _, _, _, _, r, _, g, _, b, alpha, _, _): (_, _, _, _, _, u8, _, u8, _, u8, Option<f32>, _, _)| {
            let a = alpha
                .map(|a| (a.clamp(0.0, 1.0) * 255.0).round() as u8)
                .unwrap_or(255);
            Color { r, g, b, a }
        })
        .parse_next(input)
}

/// Parse `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`, `rgb(..)` or `rgba(..)`.
pub fn parse_css_color(s: &str) -> Option<Color> {
    delimited(space0, alt((hex_color, rgb_color)), space0)
        .parse(s)
        .ok()
}

// ─── Print size ──────────────────────────────────────────────────────────

const PRINT_DPI: f32 = 150.0;
const CM_PER_INCH: f32 = 2.54;

/// Requested print size: keep the rendered size, or a `W×H` in centimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrintSize {
    Original,
    Centimeters { width: f32, height: f32 },
}

fn print_dims(input: &mut &str) -> ModalResult<(f32, f32)> {
    (space0, float, space0, one_of(['x', 'X', '×', 'х']), space0, float, space0)
        .map(|(_, w, _, _, _, h, _)| (w, h))
        .parse_next(input)
}

impl PrintSize {
    /// Parse `"original"` / `"оригинал"` or `"150x120"`.
    pub fn parse(s: &str) -> Result<Self, InputError> {
        let t = s.trim();
        let lower = t.to_lowercase();
        if lower == "original" || lower == "оригинал" {
            return Ok(PrintSize::Original);
        }
        let dims = print_dims
            .parse(t)
            .map_err(|_| InputError::PrintSize(s.to_string()))?;
        match dims {
            (width, height) if width > 0.0 && height > 0.0 => {
                Ok(PrintSize::Centimeters { width, height })
            }
            _ => Err(InputError::PrintSize(s.to_string())),
        }
    }

    /// Target pixel size at 150 DPI; `rendered` is used for `Original`.
    pub fn to_pixels(self, rendered: (u32, u32)) -> (u32, u32) {
        match self {
            PrintSize::Original => rendered,
            PrintSize::Centimeters { width, height } => (
                (width / CM_PER_INCH * PRINT_DPI).round() as u32,
                (height / CM_PER_INCH * PRINT_DPI).round() as u32,
            ),
        }
    }
}

// ─── bodyHTML emit ───────────────────────────────────────────────────────

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_html(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Render body rows as the HTML the browser board stores in `bodyHTML`.
pub fn emit_body_html(rows: &[BodyRow], coin_full: bool, active: &ActivePvState) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str("<div class=\"card-row\">");
        match row.kind {
            RowKind::Pv => {
                let fill = if coin_full { COIN_FULL } else { COIN_EMPTY };
                out.push_str(&format!(
                    "<svg class=\"coin-icon\" viewBox=\"0 0 100 100\" xmlns=\"http://www.w3.org/2000/svg\">\
                     <circle cx=\"50\" cy=\"50\" r=\"45\" fill=\"{fill}\" stroke=\"#DAA520\" stroke-width=\"5\"/></svg>"
                ));
            }
            _ if !row.label.is_empty() => {
                out.push_str(&format!(
                    "<span class=\"label\">{}</span>",
                    escape_html(&row.label)
                ));
            }
            _ => {}
        }
        out.push_str(&format!(
            "<span class=\"value\" contenteditable=\"true\">{}</span></div>",
            escape_html(&row.value)
        ));
        if row.kind == RowKind::ActiveOrders {
            out.push_str(&format!(
                "<span class=\"active-pv-hidden\" style=\"display:none\" data-btn-l=\"{}\" data-btn-r=\"{}\" \
                 data-abonusl=\"{}\" data-abonusr=\"{}\" data-locall=\"{}\" data-localr=\"{}\"></span>",
                active.button_left,
                active.button_right,
                active.carry_bonus_left,
                active.carry_bonus_right,
                active.local_overflow_left,
                active.local_overflow_right,
            ));
        }
    }
    out
}

// ─── bodyHTML scan ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Open {
        name: &'a str,
        attrs: Vec<(&'a str, &'a str)>,
        self_closing: bool,
    },
    Close(&'a str),
    Text(&'a str),
}

fn tag_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '-').parse_next(input)
}

fn attr_value<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
    ))
    .parse_next(input)
}

fn attribute<'a>(input: &mut &'a str) -> ModalResult<(&'a str, &'a str)> {
    (
        take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '-' || c == ':'),
        opt((space0, '=', space0, attr_value)),
    )
        .map(|(name, value)| (name, value.map(|(_, _, _, v)| v).unwrap_or("")))
        .parse_next(input)
}

fn open_tag<'a>(input: &mut &'a str) -> ModalResult<Token<'a>> {
    (
        '<',
        tag_name,
        repeat(0.., preceded(space1, attribute)),
        space0,
        opt('/'),
        '>',
    )
        .map(|(_, name, attrs, _, slash, _)| Token::Open {
            name,
            attrs,
            self_closing: slash.is_some(),
        })
        .parse_next(input)
}

fn close_tag<'a>(input: &mut &'a str) -> ModalResult<Token<'a>> {
    ("</", tag_name, space0, '>')
        .map(|(_, name, _, _)| Token::Close(name))
        .parse_next(input)
}

fn text<'a>(input: &mut &'a str) -> ModalResult<Token<'a>> {
    take_till(1.., '<').map(Token::Text).parse_next(input)
}

/// Split HTML into a flat token stream. Markup that does not parse as a tag
/// (a stray `<`) is kept as text.
fn tokenize(html: &str) -> Vec<Token<'_>> {
    let mut input = html;
    let mut tokens = Vec::new();
    while !input.is_empty() {
        match alt((close_tag, open_tag, text)).parse_next(&mut input) {
            Ok(tok) => tokens.push(tok),
            Err(_) => {
                let (lt, rest) = input.split_at(1);
                tokens.push(Token::Text(lt));
                input = rest;
            }
        }
    }
    tokens
}

fn has_class(attrs: &[(&str, &str)], class: &str) -> bool {
    attrs
        .iter()
        .any(|(k, v)| *k == "class" && v.split_whitespace().any(|c| c == class))
}

fn attr<'a>(attrs: &[(&'a str, &'a str)], name: &str) -> Option<&'a str> {
    attrs.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
}

fn attr_u32(attrs: &[(&str, &str)], name: &str) -> u32 {
    attr(attrs, name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

/// Rows and hidden state recovered from a `bodyHTML` string.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScannedBody {
    pub rows: Vec<BodyRow>,
    pub coin_full: Option<bool>,
    pub active: Option<ActivePvState>,
}

#[derive(Clone, Copy, PartialEq)]
enum Capture {
    Label,
    Value,
}

#[derive(Default)]
struct RowDraft {
    label: Option<String>,
    value: Option<String>,
    coin: bool,
}

impl RowDraft {
    fn finish(self) -> Option<BodyRow> {
        let value = self.value?.trim().to_string();
        let label = self.label.map(|l| l.trim().to_string()).unwrap_or_default();
        let kind = if !label.is_empty() {
            RowKind::from_label(&label)
        } else if self.coin || parse_pv_progress(&value).is_some() {
            RowKind::Pv
        } else {
            RowKind::Custom
        };
        Some(BodyRow { kind, label, value })
    }
}

/// Recover structured rows from a body HTML string.
///
/// Each `card-row` element yields one row from its `label` and `value`
/// spans (nested markup inside a value, like colored number spans, is
/// flattened to text). The coin fill and the hidden active-PV counters are
/// picked up when present.
pub fn scan_body_html(html: &str) -> ScannedBody {
    let mut scanned = ScannedBody::default();
    let mut current: Option<RowDraft> = None;
    let mut capture: Option<(Capture, usize, String)> = None;

    for token in tokenize(html) {
        if let Some((target, depth, buf)) = capture.as_mut() {
            match &token {
                Token::Text(t) => buf.push_str(t),
                Token::Open {
                    name: "span",
                    self_closing: false,
                    ..
                } => *depth += 1,
                Token::Open { name: "br", .. } => buf.push('\n'),
                Token::Close("span") => {
                    *depth -= 1;
                    if *depth == 0 {
                        let text = unescape_html(buf);
                        let target = *target;
                        capture = None;
                        let row = current.get_or_insert_with(RowDraft::default);
                        match target {
                            Capture::Label => row.label = Some(text),
                            Capture::Value => row.value = Some(text),
                        }
                    }
                }
                _ => {}
            }
            continue;
        }

        if let Token::Open { name, attrs, self_closing } = token {
            match name {
                "div" if has_class(&attrs, "card-row") => {
                    if let Some(row) = current.take().and_then(RowDraft::finish) {
                        scanned.rows.push(row);
                    }
                    current = Some(RowDraft::default());
                }
                "span" if has_class(&attrs, "active-pv-hidden") => {
                    scanned.active = Some(ActivePvState {
                        button_left: attr_u32(&attrs, "data-btn-l"),
                        button_right: attr_u32(&attrs, "data-btn-r"),
                        carry_bonus_left: attr_u32(&attrs, "data-abonusl"),
                        carry_bonus_right: attr_u32(&attrs, "data-abonusr"),
                        local_overflow_left: attr_u32(&attrs, "data-locall"),
                        local_overflow_right: attr_u32(&attrs, "data-localr"),
                    });
                }
                "span" if !self_closing && has_class(&attrs, "label") => {
                    capture = Some((Capture::Label, 1, String::new()));
                }
                "span" if !self_closing && has_class(&attrs, "value") => {
                    capture = Some((Capture::Value, 1, String::new()));
                }
                "circle" => {
                    if let Some(fill) = attr(&attrs, "fill") {
                        scanned.coin_full = Some(!fill.eq_ignore_ascii_case(COIN_EMPTY));
                    }
                    current.get_or_insert_with(RowDraft::default).coin = true;
                }
                _ => {}
            }
        }
    }

    if let Some(row) = current.and_then(RowDraft::finish) {
        scanned.rows.push(row);
    }
    scanned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::default_body;
    use pretty_assertions::assert_eq;

    #[test]
    fn pair_parses_with_loose_spacing() {
        assert_eq!(parse_pair("0 / 0"), Some(Pair::new(0, 0)));
        assert_eq!(parse_pair("12/300"), Some(Pair::new(12, 300)));
        assert_eq!(parse_pair("  7 /  9 extra"), Some(Pair::new(7, 9)));
        assert_eq!(parse_pair("seven / 9"), None);
    }

    #[test]
    fn pv_progress_fullness() {
        let full = parse_pv_progress("330/330pv").unwrap();
        assert!(full.is_full());
        let partial = parse_pv_progress("30/330PV").unwrap();
        assert!(!partial.is_full());
        assert_eq!(partial.current, 30);
        assert!(!parse_pv_progress("0/0").unwrap().is_full());
    }

    #[test]
    fn css_px_widths() {
        assert_eq!(parse_css_px("494px"), Some(494.0));
        assert_eq!(parse_css_px("380"), Some(380.0));
        assert_eq!(parse_css_px("wide"), None);
        assert_eq!(parse_css_px("0px"), None);
    }

    #[test]
    fn css_colors() {
        assert_eq!(parse_css_color("#112233"), Some(Color::rgb(0x11, 0x22, 0x33)));
        assert_eq!(parse_css_color("#fff"), Some(Color::rgb(255, 255, 255)));
        assert_eq!(
            parse_css_color("rgb(93, 139, 244)"),
            Some(Color::rgb(93, 139, 244))
        );
        assert_eq!(
            parse_css_color("rgba(0,0,0,0.5)").map(|c| c.a),
            Some(128)
        );
        assert_eq!(parse_css_color("#12345"), None);
        assert_eq!(parse_css_color("rgb(300, 0, 0)"), None);
        assert_eq!(parse_css_color("blue"), None);
    }

    #[test]
    fn print_size_parsing() {
        assert_eq!(PrintSize::parse("оригинал"), Ok(PrintSize::Original));
        assert_eq!(
            PrintSize::parse("150x120"),
            Ok(PrintSize::Centimeters {
                width: 150.0,
                height: 120.0
            })
        );
        assert!(PrintSize::parse("150").is_err());
        assert!(PrintSize::parse("0x10").is_err());
        assert!(PrintSize::parse("axb").is_err());

        let px = PrintSize::parse("2.54x5.08").unwrap().to_pixels((1, 1));
        assert_eq!(px, (150, 300));
    }

    #[test]
    fn emitted_body_scans_back() {
        let rows = default_body("30/330pv");
        let active = ActivePvState {
            button_left: 11,
            carry_bonus_right: 2,
            local_overflow_left: 1,
            ..Default::default()
        };
        let html = emit_body_html(&rows, false, &active);
        let scanned = scan_body_html(&html);
        assert_eq!(scanned.rows, rows);
        assert_eq!(scanned.coin_full, Some(false));
        assert_eq!(scanned.active, Some(active));
    }

    #[test]
    fn scans_browser_markup_with_nested_spans() {
        let html = r##"
        <div class="card-row">
          <svg class="coin-icon" viewBox="0 0 100 100"><circle cx="50" cy="50" r="45" fill="#ffd700" stroke="#DAA520" stroke-width="5"/></svg>
          <span class="value" contenteditable="true">330/330pv</span>
        </div>
        <div class="card-row"><span class="label">Баланс:</span><span class="value" contenteditable="true">4 / <span data-num-color="#e53935" style="color:#e53935">5</span></span></div>
        <div class="card-row"><span class="label">Phone</span><span class="value">a &amp; b</span></div>
        "##;
        let scanned = scan_body_html(html);
        assert_eq!(scanned.rows.len(), 3);
        assert_eq!(scanned.rows[0].kind, RowKind::Pv);
        assert_eq!(scanned.rows[1].kind, RowKind::Balance);
        assert_eq!(scanned.rows[1].value, "4 / 5");
        assert_eq!(scanned.rows[2].kind, RowKind::Custom);
        assert_eq!(scanned.rows[2].value, "a & b");
        assert_eq!(scanned.coin_full, Some(true));
        assert_eq!(scanned.active, None);
    }

    #[test]
    fn stray_angle_bracket_is_text() {
        let scanned =
            scan_body_html(r#"<div class="card-row"><span class="value">1 < 2</span></div>"#);
        assert_eq!(scanned.rows[0].value, "1 < 2");
    }
}
