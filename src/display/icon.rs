use std::fmt::Write as _;

/// Palette used by the status icons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Background,
    Text,
    Success,
    Failure,
    Neutral,
    Warning,
}

impl Color {
    pub fn hex(&self) -> &'static str {
        match self {
            Color::Background => "#000000",
            Color::Text => "#ffffff",
            Color::Success => "#2ecc40",
            Color::Failure => "#ff4136",
            Color::Neutral => "#0074d9",
            Color::Warning => "#ffb700",
        }
    }
}

/// What a piece of text on the icon represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextRole {
    Label,
    SubLabel,
    Title,
    Stage,
    Caption,
    Corner,
}

impl TextRole {
    fn class(&self) -> &'static str {
        match self {
            TextRole::Label => "label",
            TextRole::SubLabel => "sublabel",
            TextRole::Title => "title",
            TextRole::Stage => "stage",
            TextRole::Caption => "caption",
            TextRole::Corner => "corner",
        }
    }
}

/// Horizontally centred text with its top edge at `y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOp {
    pub role: TextRole,
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub size: u32,
    pub bold: bool,
    pub color: Color,
}

/// A square icon described as an ordered list of draw operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconImage {
    pub size: u32,
    pub background: Color,
    pub ops: Vec<TextOp>,
}

impl IconImage {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            background: Color::Background,
            ops: Vec::new(),
        }
    }

    pub fn push(&mut self, op: TextOp) {
        self.ops.push(op);
    }

    pub fn with_role(&self, role: TextRole) -> impl Iterator<Item = &TextOp> {
        self.ops.iter().filter(move |op| op.role == role)
    }

    /// Text of the first op with `role`, if any.
    pub fn text_of(&self, role: TextRole) -> Option<&str> {
        self.with_role(role).next().map(|op| op.text.as_str())
    }

    pub fn to_svg(&self) -> String {
        let size = self.size;
        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{size}\" height=\"{size}\" viewBox=\"0 0 {size} {size}\">"
        );
        let _ = write!(
            svg,
            "<rect width=\"{size}\" height=\"{size}\" fill=\"{}\"/>",
            self.background.hex()
        );
        for op in &self.ops {
            let weight = if op.bold { " font-weight=\"bold\"" } else { "" };
            let _ = write!(
                svg,
                "<text class=\"{}\" x=\"{}\" y=\"{}\" font-family=\"sans-serif\" font-size=\"{}\"{weight} fill=\"{}\" text-anchor=\"middle\" dominant-baseline=\"hanging\">{}</text>",
                op.role.class(),
                op.x,
                op.y,
                op.size,
                op.color.hex(),
                escape_xml(&op.text)
            );
        }
        svg.push_str("</svg>");
        svg
    }

    /// Inline image string accepted by the host's set-image request.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/svg+xml;charset=utf8,{}",
            escape_data_url(&self.to_svg())
        )
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn escape_data_url(svg: &str) -> String {
    let mut out = String::with_capacity(svg.len());
    for ch in svg.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '#' => out.push_str("%23"),
            '\n' => out.push_str("%0A"),
            c => out.push(c),
        }
    }
    out
}
