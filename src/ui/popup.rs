use crate::core::constants::{ANONYMOUS, FACE_SIZE, UNKNOWN};
use crate::data::location::LocationUpdate;
use crate::prelude::HashMap;
use crate::traits::PopupRenderer;

/// Escapes text for use inside HTML elements and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Default popup builder, producing the recorder's classic marker popup.
#[derive(Debug, Clone, Default)]
pub struct HtmlPopup {
    /// Display names keyed by `user/device`
    renames: HashMap<String, String>,
}

impl HtmlPopup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_renames(renames: HashMap<String, String>) -> Self {
        Self { renames }
    }

    /// Nicest available name: rename table, then `name`, `label`, `tid`,
    /// then the `user/device` part of the topic.
    pub fn cosmetic_name(&self, update: &LocationUpdate) -> String {
        let base_topic = update.base_topic();

        base_topic
            .as_ref()
            .and_then(|topic| self.renames.get(topic).cloned())
            .or_else(|| non_empty(&update.name))
            .or_else(|| non_empty(&update.label))
            .or_else(|| non_empty(&update.tid))
            .or_else(|| base_topic.clone())
            .unwrap_or_else(|| ANONYMOUS.to_string())
    }

    /// Address when known, otherwise `lat, lon`.
    pub fn cosmetic_location(&self, update: &LocationUpdate) -> String {
        non_empty(&update.addr).unwrap_or_else(|| format!("{}, {}", update.lat, update.lon))
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

fn format_tst(tst: i64) -> Option<String> {
    chrono::DateTime::from_timestamp(tst, 0).map(|t| t.format("%d %b %Y %H:%M:%S UTC").to_string())
}

impl PopupRenderer for HtmlPopup {
    fn title(&self, update: &LocationUpdate) -> String {
        format!("{} {}", self.cosmetic_name(update), self.cosmetic_location(update))
    }

    fn html(&self, update: &LocationUpdate) -> String {
        let mut html = String::new();

        if let Some(face) = non_empty(&update.face) {
            html.push_str(&format!(
                "<img class='face' alt='' src='data:image/png;base64,{}' height='{}' width='{}'>",
                escape_html(&face.replace('\'', "")),
                FACE_SIZE,
                FACE_SIZE
            ));
        }

        html.push_str(&format!(
            "<span class=\"name\"><b>{}</b><br></span>",
            escape_html(&self.cosmetic_name(update))
        ));
        html.push_str(&format!(
            "<span class=\"location\">{}<br></span>",
            escape_html(&self.cosmetic_location(update))
        ));

        html.push_str(&format!(
            "<span class='low-level'>{}, {}",
            escape_html(&non_empty(&update.ghash).unwrap_or_else(|| UNKNOWN.to_string())),
            escape_html(&update.base_topic().unwrap_or_else(|| UNKNOWN.to_string()))
        ));
        if let Some(date) = update.tst.and_then(format_tst) {
            html.push_str(&format!(", </span><span class=\"date\">{}", date));
        }
        html.push_str("<br></span>");

        html.push_str(&format!(
            "<span class=\"lat-lon\">({},{}), </span>",
            update.lat, update.lon
        ));

        let mut misc = Vec::new();
        misc.push(match update.acc {
            Some(acc) => format!("acc: {} m", acc),
            None => "acc: ?".to_string(),
        });
        if let Some(vel) = update.vel {
            misc.push(format!("vel: {} km/h", vel));
        }
        if let Some(batt) = update.batt {
            misc.push(format!("batt: {}%", batt));
        }
        if let Some(cog) = update.cog {
            misc.push(format!("cog: {}", cog));
        }
        html.push_str(&format!("<span class='misc'>{}</span>", misc.join(", ")));

        html
    }
}
