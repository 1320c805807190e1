//! Script-facing tagged encodings. In-process the bridge is plain enum
//! dispatch; these are the language-independent `{type, variant, values?}`
//! shapes a scripting frontend pattern-matches on.

use serde_json::{Value, json};

use crate::buffer::BufferKind;
use crate::call::{PaneTypeView, SizingView};
use crate::editor::{EditorOptions, OptionsUpdate};
use crate::pane::Frame;

pub fn buffer_kind_wire(kind: BufferKind) -> Value {
    let variant = match kind {
        BufferKind::Naive => "naive",
        BufferKind::Gap => "gap",
    };
    json!({ "type": "EditorBufferType", "variant": variant })
}

pub fn buffer_kind_from_wire(value: &Value) -> Option<BufferKind> {
    if value.get("type")?.as_str()? != "EditorBufferType" {
        return None;
    }
    match value.get("variant")?.as_str()? {
        "naive" => Some(BufferKind::Naive),
        "gap" => Some(BufferKind::Gap),
        _ => None,
    }
}

fn sizing_wire(sizing: SizingView) -> Value {
    match sizing {
        SizingView::Percent { first_percent } => json!({
            "variant": "percent",
            "values": { "first_percent": first_percent },
        }),
        SizingView::FirstFixed { size } => json!({
            "variant": "first_fixed",
            "values": { "size": size },
        }),
        SizingView::SecondFixed { size } => json!({
            "variant": "second_fixed",
            "values": { "size": size },
        }),
    }
}

pub fn pane_type_wire(view: PaneTypeView) -> Value {
    match view {
        PaneTypeView::Leaf => json!({ "type": "pane_node_type", "variant": "leaf" }),
        PaneTypeView::VSplit(sizing) => json!({
            "type": "pane_node_type",
            "variant": "vsplit",
            "values": [{ "values": { "split_type": sizing_wire(sizing) } }],
        }),
        PaneTypeView::HSplit(sizing) => json!({
            "type": "pane_node_type",
            "variant": "hsplit",
            "values": [{ "values": { "split_type": sizing_wire(sizing) } }],
        }),
    }
}

pub fn frame_wire(frame: Frame) -> Value {
    serde_json::to_value(frame).expect("invariant: frame serializes")
}

pub fn options_wire(options: EditorOptions) -> Value {
    let values = serde_json::to_value(options).expect("invariant: options serialize");
    json!({ "values": values })
}

/// Parses a partial options table; unknown fields are ignored, absent
/// fields stay unset so the merge leaves them alone.
pub fn options_update_from_wire(value: &Value) -> OptionsUpdate {
    let values = value.get("values").unwrap_or(value);
    serde_json::from_value(values.clone()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::buffer::BufferKind;
    use crate::call::{PaneTypeView, SizingView};
    use crate::editor::EditorOptions;
    use crate::pane::Frame;

    #[test]
    fn buffer_kind_should_round_trip_through_the_wire() {
        for kind in [BufferKind::Naive, BufferKind::Gap] {
            let wire = buffer_kind_wire(kind);
            assert_eq!(wire["type"], "EditorBufferType");
            assert_eq!(buffer_kind_from_wire(&wire), Some(kind));
        }
        assert_eq!(buffer_kind_from_wire(&json!({ "variant": "gap" })), None);
    }

    #[test]
    fn leaf_pane_should_encode_without_values() {
        let wire = pane_type_wire(PaneTypeView::Leaf);
        assert_eq!(wire, json!({ "type": "pane_node_type", "variant": "leaf" }));
    }

    #[test]
    fn percent_split_should_nest_first_percent() {
        let wire = pane_type_wire(PaneTypeView::VSplit(SizingView::Percent {
            first_percent: 0.25,
        }));
        assert_eq!(wire["variant"], "vsplit");
        let split_type = &wire["values"][0]["values"]["split_type"];
        assert_eq!(split_type["variant"], "percent");
        assert_eq!(split_type["values"]["first_percent"], 0.25);
    }

    #[test]
    fn fixed_split_should_carry_its_size() {
        let wire = pane_type_wire(PaneTypeView::HSplit(SizingView::SecondFixed { size: 3 }));
        assert_eq!(wire["variant"], "hsplit");
        let split_type = &wire["values"][0]["values"]["split_type"];
        assert_eq!(split_type["variant"], "second_fixed");
        assert_eq!(split_type["values"]["size"], 3);
    }

    #[test]
    fn frame_should_expose_all_four_fields() {
        let wire = frame_wire(Frame {
            x: 1,
            y: 2,
            rows: 3,
            cols: 4,
        });
        assert_eq!(wire, json!({ "x": 1, "y": 2, "rows": 3, "cols": 4 }));
    }

    #[test]
    fn options_update_should_parse_partial_tables() {
        let update = options_update_from_wire(&json!({ "values": { "tab_width": 2 } }));
        assert_eq!(update.tab_width, Some(2));
        assert_eq!(update.expand_tabs, None);

        let update = options_update_from_wire(&json!({ "expand_tabs": true }));
        assert_eq!(update.tab_width, None);
        assert_eq!(update.expand_tabs, Some(true));
    }

    #[test]
    fn options_should_encode_under_values() {
        let wire = options_wire(EditorOptions {
            tab_width: 8,
            expand_tabs: true,
        });
        assert_eq!(wire["values"]["tab_width"], 8);
        assert_eq!(wire["values"]["expand_tabs"], true);
    }
}
