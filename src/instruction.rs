use serde::{Deserialize, Serialize};

/// One discrete drawing command in logical 1024x768 canvas space.
///
/// The wire format is internally tagged by `action` (`drawText`, `drawArrow`,
/// `drawCircle`, `drawRectangle`, `drawLine`). Actions outside that set decode
/// to [`Instruction::Unknown`] so a newer producer cannot abort a batch; the
/// engine skips them with a logged warning.
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    /// Centered text with an opaque background box.
    Text(TextSpec),
    /// Straight shaft with a filled triangular arrowhead.
    Arrow(ArrowSpec),
    /// Circle outline with optional fill.
    Circle(CircleSpec),
    /// Rectangle outline with optional translucent fill.
    Rectangle(RectSpec),
    /// Straight line segment.
    Line(LineSpec),
    /// Unrecognized action kept for forward compatibility.
    Unknown {
        /// The unrecognized `action` tag (may be empty when absent).
        action: String,
    },
}

/// Fields of a `drawText` instruction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSpec {
    /// Text content.
    pub content: String,
    /// Horizontal center in logical units.
    pub x: f64,
    /// Vertical center in logical units.
    pub y: f64,
    /// Explicit font size; overrides the style lookup when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// Named style (`title`/`subtitle`/`bold`/`normal`/`small`); anything
    /// else falls back to the normal size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Requested glyph color; ignored, glyphs are always black.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl TextSpec {
    /// Resolved font size: explicit `font_size`, else the style lookup
    /// (`title=24, subtitle=20, bold=18, normal=16, small=12`, default 16).
    pub fn resolved_font_size(&self) -> f64 {
        if let Some(size) = self.font_size {
            return size;
        }
        match self.style.as_deref() {
            Some("title") => 24.0,
            Some("subtitle") => 20.0,
            Some("bold") => 18.0,
            Some("small") => 12.0,
            _ => 16.0,
        }
    }

    /// Whether the style selects a bold weight (`bold` or `title`).
    pub fn is_bold(&self) -> bool {
        matches!(self.style.as_deref(), Some("bold") | Some("title"))
    }
}

/// Fields of a `drawArrow` instruction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrowSpec {
    /// Shaft start x.
    pub x1: f64,
    /// Shaft start y.
    pub y1: f64,
    /// Shaft end (tip) x.
    pub x2: f64,
    /// Shaft end (tip) y.
    pub y2: f64,
    /// Shaft stroke width, default 2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Requested color; ignored, arrows use a picked accent color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Fields of a `drawCircle` instruction.
///
/// `cx`/`cy`/`r` are required by validation but optional on the wire so a
/// malformed instruction stays representable and can be skipped at execute
/// time instead of aborting batch decode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleSpec {
    /// Center x.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cx: Option<f64>,
    /// Center y.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cy: Option<f64>,
    /// Radius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<f64>,
    /// Stroke color, default black.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    /// Fill color; absent or the literal `"none"` disables fill.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    /// Stroke width, default 2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
}

impl CircleSpec {
    /// Return `(cx, cy, r)` when all required geometry fields are present.
    pub fn geometry(&self) -> Option<(f64, f64, f64)> {
        Some((self.cx?, self.cy?, self.r?))
    }
}

/// Fields of a `drawRectangle` instruction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RectSpec {
    /// Left edge x.
    pub x: f64,
    /// Top edge y.
    pub y: f64,
    /// Width in logical units.
    pub width: f64,
    /// Height in logical units.
    pub height: f64,
    /// Requested stroke color; ignored, rectangles use a picked accent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    /// Fill request; presence (and not `"none"`) enables a translucent
    /// fill in the picked accent color, not the requested one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    /// Stroke width, default 2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
}

impl RectSpec {
    /// Whether a fill pass is requested.
    pub fn wants_fill(&self) -> bool {
        matches!(self.fill.as_deref(), Some(f) if f != "none")
    }
}

/// Fields of a `drawLine` instruction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSpec {
    /// Start x.
    pub x1: f64,
    /// Start y.
    pub y1: f64,
    /// End x.
    pub x2: f64,
    /// End y.
    pub y2: f64,
    /// Stroke width, default 2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Requested color; ignored, lines use a picked accent color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Serde-facing closed form of the known instruction set.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum Tagged {
    DrawText(TextSpec),
    DrawArrow(ArrowSpec),
    DrawCircle(CircleSpec),
    DrawRectangle(RectSpec),
    DrawLine(LineSpec),
}

impl From<Tagged> for Instruction {
    fn from(t: Tagged) -> Self {
        match t {
            Tagged::DrawText(s) => Self::Text(s),
            Tagged::DrawArrow(s) => Self::Arrow(s),
            Tagged::DrawCircle(s) => Self::Circle(s),
            Tagged::DrawRectangle(s) => Self::Rectangle(s),
            Tagged::DrawLine(s) => Self::Line(s),
        }
    }
}

impl Instruction {
    /// The wire `action` tag for this instruction.
    pub fn action(&self) -> &str {
        match self {
            Self::Text(_) => "drawText",
            Self::Arrow(_) => "drawArrow",
            Self::Circle(_) => "drawCircle",
            Self::Rectangle(_) => "drawRectangle",
            Self::Line(_) => "drawLine",
            Self::Unknown { action } => action,
        }
    }
}

const KNOWN_ACTIONS: [&str; 5] = [
    "drawText",
    "drawArrow",
    "drawCircle",
    "drawRectangle",
    "drawLine",
];

impl Serialize for Instruction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self.clone() {
            Self::Text(s) => Tagged::DrawText(s).serialize(serializer),
            Self::Arrow(s) => Tagged::DrawArrow(s).serialize(serializer),
            Self::Circle(s) => Tagged::DrawCircle(s).serialize(serializer),
            Self::Rectangle(s) => Tagged::DrawRectangle(s).serialize(serializer),
            Self::Line(s) => Tagged::DrawLine(s).serialize(serializer),
            Self::Unknown { action } => {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("action", &action)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Instruction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        if !value.is_object() {
            return Err(serde::de::Error::custom("instruction must be a JSON object"));
        }
        let action = value
            .get("action")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        if !KNOWN_ACTIONS.contains(&action.as_str()) {
            return Ok(Self::Unknown { action });
        }

        serde_json::from_value::<Tagged>(value)
            .map(Into::into)
            .map_err(serde::de::Error::custom)
    }
}

/// Leniently decode an instruction batch from a JSON array.
///
/// Elements that fail to decode (e.g. a known action missing required
/// fields) are skipped with a logged warning; the rest of the batch
/// survives. A non-array value yields an empty batch.
pub fn parse_instructions(value: &serde_json::Value) -> Vec<Instruction> {
    let Some(items) = value.as_array() else {
        tracing::warn!("instruction batch is not a JSON array, ignoring");
        return Vec::new();
    };

    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match serde_json::from_value::<Instruction>(item.clone()) {
            Ok(instr) => out.push(instr),
            Err(e) => {
                tracing::warn!(index = i, error = %e, "skipping undecodable instruction");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_tagged_circle() {
        let instr: Instruction =
            serde_json::from_value(json!({"action": "drawCircle", "cx": 100, "cy": 100, "r": 5}))
                .unwrap();
        let Instruction::Circle(c) = instr else {
            panic!("expected circle");
        };
        assert_eq!(c.geometry(), Some((100.0, 100.0, 5.0)));
    }

    #[test]
    fn circle_without_geometry_decodes_but_fails_validation() {
        let instr: Instruction =
            serde_json::from_value(json!({"action": "drawCircle"})).unwrap();
        let Instruction::Circle(c) = instr else {
            panic!("expected circle");
        };
        assert!(c.geometry().is_none());
    }

    #[test]
    fn unknown_action_decodes_to_fallback() {
        let instr: Instruction =
            serde_json::from_value(json!({"action": "drawSpline", "x": 1})).unwrap();
        assert_eq!(
            instr,
            Instruction::Unknown {
                action: "drawSpline".to_string()
            }
        );
    }

    #[test]
    fn camel_case_fields_round_trip() {
        let instr: Instruction = serde_json::from_value(json!({
            "action": "drawText",
            "content": "hi",
            "x": 10,
            "y": 20,
            "fontSize": 18,
            "style": "bold"
        }))
        .unwrap();
        let back = serde_json::to_value(&instr).unwrap();
        assert_eq!(back["action"], "drawText");
        assert_eq!(back["fontSize"], 18.0);

        let again: Instruction = serde_json::from_value(back).unwrap();
        assert_eq!(again, instr);
    }

    #[test]
    fn style_lookup_sizes() {
        let mut spec = TextSpec {
            content: "x".into(),
            x: 0.0,
            y: 0.0,
            font_size: None,
            style: Some("title".into()),
            color: None,
        };
        assert_eq!(spec.resolved_font_size(), 24.0);
        assert!(spec.is_bold());

        spec.style = Some("small".into());
        assert_eq!(spec.resolved_font_size(), 12.0);
        assert!(!spec.is_bold());

        spec.style = Some("shouting".into());
        assert_eq!(spec.resolved_font_size(), 16.0);

        spec.style = None;
        spec.font_size = Some(40.0);
        assert_eq!(spec.resolved_font_size(), 40.0);
    }

    #[test]
    fn parse_instructions_skips_undecodable_elements() {
        let batch = parse_instructions(&json!([
            {"action": "drawLine", "x1": 0, "y1": 0, "x2": 10, "y2": 10},
            {"action": "drawLine", "x1": "oops"},
            {"action": "drawGlyph"},
            {"action": "drawRectangle", "x": 1, "y": 2, "width": 3, "height": 4}
        ]));
        assert_eq!(batch.len(), 3);
        assert!(matches!(batch[0], Instruction::Line(_)));
        assert!(matches!(batch[1], Instruction::Unknown { .. }));
        assert!(matches!(batch[2], Instruction::Rectangle(_)));
    }
}
