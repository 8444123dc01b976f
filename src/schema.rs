//! Static widget, property and enumeration registries
//!
//! The registries are fixed at build time and indexed once per process by
//! [`SymbolTables::global`]. Ids share the bytecode with the terminator value
//! `0x00`, so no entry may use it, and property ids must leave bit 7 free for
//! the binding flag.

use crate::types::ValueType;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WidgetEntry {
    pub name: &'static str,
    pub tag: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PropertyEntry {
    pub name: &'static str,
    pub id: u8,
    pub value_type: ValueType,
}

/// A named enumeration constant. All enumeration domains share one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnumEntry {
    pub name: &'static str,
    pub value: u8,
}

const fn widget(name: &'static str, tag: u8) -> WidgetEntry {
    WidgetEntry { name, tag }
}

const fn property(name: &'static str, id: u8, value_type: ValueType) -> PropertyEntry {
    PropertyEntry { name, id, value_type }
}

const fn enumeration(name: &'static str, value: u8) -> EnumEntry {
    EnumEntry { name, value }
}

pub const WIDGETS: &[WidgetEntry] = &[
    widget("Button", 1),
    widget("Label", 2),
    widget("ComboBox", 3),
    widget("TreeView", 4),
    widget("ListBox", 5),
    widget("Picture", 6),
    widget("TextBox", 7),
    widget("CheckBox", 8),
    widget("RadioButton", 9),
    widget("ScrollView", 10),
    widget("ScrollBar", 11),
    widget("Slider", 12),
    widget("ProgressBar", 13),
    widget("SpinEdit", 14),
    widget("Separator", 15),
    widget("Spacer", 16),
    widget("Panel", 17),
    widget("Container", 18),
    widget("TabLayout", 19),
    widget("CanvasLayout", 20),
    widget("FlowLayout", 21),
    widget("GridLayout", 22),
    widget("DockLayout", 23),
    widget("StackLayout", 24),
];

pub const PROPERTIES: &[PropertyEntry] = &[
    property("horizontalAlignment", 1, ValueType::Enumeration),
    property("verticalAlignment", 2, ValueType::Enumeration),
    property("margin", 3, ValueType::Margins),
    property("padding", 4, ValueType::Margins),
    property("dockSite", 5, ValueType::Enumeration),
    property("visibility", 6, ValueType::Enumeration),
    property("enabled", 7, ValueType::Boolean),
    property("hitTestVisible", 8, ValueType::Boolean),
    property("fontFamily", 9, ValueType::Enumeration),
    property("text", 10, ValueType::String),
    property("minimum", 11, ValueType::Number),
    property("maximum", 12, ValueType::Number),
    property("value", 13, ValueType::Number),
    property("image", 14, ValueType::Resource),
    property("imageScaling", 15, ValueType::Enumeration),
    property("rows", 16, ValueType::SizeList),
    property("columns", 17, ValueType::SizeList),
    property("left", 18, ValueType::Integer),
    property("top", 19, ValueType::Integer),
    property("orientation", 20, ValueType::Enumeration),
    property("displayProgressStyle", 21, ValueType::Enumeration),
    property("isChecked", 22, ValueType::Boolean),
    property("tabTitle", 23, ValueType::String),
    property("selectedIndex", 24, ValueType::Integer),
    property("columnSpan", 25, ValueType::Integer),
    property("rowSpan", 26, ValueType::Integer),
    property("toolTip", 27, ValueType::String),
    property("widthHint", 28, ValueType::Integer),
    property("heightHint", 29, ValueType::Integer),
];

pub const ENUMERATIONS: &[EnumEntry] = &[
    enumeration("none", 0),
    // alignment and dock sites
    enumeration("left", 1),
    enumeration("center", 2),
    enumeration("right", 3),
    enumeration("top", 4),
    enumeration("middle", 5),
    enumeration("bottom", 6),
    enumeration("stretch", 7),
    // visibility
    enumeration("visible", 8),
    enumeration("hidden", 9),
    enumeration("collapsed", 10),
    // orientation
    enumeration("vertical", 11),
    enumeration("horizontal", 12),
    // font families
    enumeration("sans", 13),
    enumeration("serif", 14),
    enumeration("monospace", 15),
    // progress display
    enumeration("percent", 16),
    enumeration("absolute", 17),
    // image scaling
    enumeration("zoom", 18),
    enumeration("contain", 19),
    enumeration("cover", 20),
];

/// Name and id indexes over the static registries
#[derive(Debug)]
pub struct SymbolTables {
    widgets: HashMap<&'static str, WidgetEntry>,
    properties: HashMap<&'static str, PropertyEntry>,
    enumerations: HashMap<&'static str, EnumEntry>,
    widgets_by_tag: HashMap<u8, WidgetEntry>,
    properties_by_id: HashMap<u8, PropertyEntry>,
    enumerations_by_value: HashMap<u8, EnumEntry>,
}

impl SymbolTables {
    /// The process-wide tables for the shipped schema
    pub fn global() -> &'static SymbolTables {
        static TABLES: OnceLock<SymbolTables> = OnceLock::new();
        TABLES.get_or_init(|| {
            log::debug!(
                "Indexing schema: {} widgets, {} properties, {} enumeration values",
                WIDGETS.len(),
                PROPERTIES.len(),
                ENUMERATIONS.len()
            );
            SymbolTables::from_schema(WIDGETS, PROPERTIES, ENUMERATIONS)
        })
    }

    pub fn from_schema(
        widgets: &[WidgetEntry],
        properties: &[PropertyEntry],
        enumerations: &[EnumEntry],
    ) -> Self {
        Self {
            widgets: widgets.iter().map(|w| (w.name, *w)).collect(),
            properties: properties.iter().map(|p| (p.name, *p)).collect(),
            enumerations: enumerations.iter().map(|e| (e.name, *e)).collect(),
            widgets_by_tag: widgets.iter().map(|w| (w.tag, *w)).collect(),
            properties_by_id: properties.iter().map(|p| (p.id, *p)).collect(),
            enumerations_by_value: enumerations.iter().fold(HashMap::new(), |mut map, e| {
                map.entry(e.value).or_insert(*e);
                map
            }),
        }
    }

    pub fn widget(&self, name: &str) -> Option<&WidgetEntry> {
        self.widgets.get(name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyEntry> {
        self.properties.get(name)
    }

    pub fn enumeration(&self, name: &str) -> Option<&EnumEntry> {
        self.enumerations.get(name)
    }

    pub fn widget_by_tag(&self, tag: u8) -> Option<&WidgetEntry> {
        self.widgets_by_tag.get(&tag)
    }

    pub fn property_by_id(&self, id: u8) -> Option<&PropertyEntry> {
        self.properties_by_id.get(&id)
    }

    /// First enumeration name registered for `value`
    pub fn enumeration_name(&self, value: u8) -> Option<&'static str> {
        self.enumerations_by_value.get(&value).map(|e| e.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BINDING_FLAG, PROPERTY_TERMINATOR, WIDGET_TERMINATOR};
    use std::collections::HashSet;

    #[test]
    fn test_widget_tags_are_unique_and_not_terminator() {
        let mut seen = HashSet::new();
        for w in WIDGETS {
            assert_ne!(w.tag, WIDGET_TERMINATOR, "{} uses the terminator tag", w.name);
            assert!(seen.insert(w.tag), "duplicate widget tag {}", w.tag);
        }
    }

    #[test]
    fn test_property_ids_fit_below_binding_flag() {
        let mut seen = HashSet::new();
        for p in PROPERTIES {
            assert_ne!(p.id, PROPERTY_TERMINATOR, "{} uses the terminator id", p.name);
            assert_eq!(p.id & BINDING_FLAG, 0, "{} collides with the binding flag", p.name);
            assert!(seen.insert(p.id), "duplicate property id {}", p.id);
        }
    }

    #[test]
    fn test_names_are_unique_per_registry() {
        let widgets: HashSet<_> = WIDGETS.iter().map(|w| w.name).collect();
        let properties: HashSet<_> = PROPERTIES.iter().map(|p| p.name).collect();
        let enums: HashSet<_> = ENUMERATIONS.iter().map(|e| e.name).collect();
        assert_eq!(widgets.len(), WIDGETS.len());
        assert_eq!(properties.len(), PROPERTIES.len());
        assert_eq!(enums.len(), ENUMERATIONS.len());
        // a name may not be both, the compiler would always pick the property
        assert!(widgets.is_disjoint(&properties));
    }

    #[test]
    fn test_reserved_words_are_not_registered() {
        let tables = SymbolTables::global();
        for word in ["bind", "resource", "auto", "expand", "true", "false", "yes", "no"] {
            assert!(tables.property(word).is_none(), "{} is a property", word);
            assert!(tables.widget(word).is_none(), "{} is a widget", word);
            assert!(tables.enumeration(word).is_none(), "{} is an enum value", word);
        }
    }

    #[test]
    fn test_global_lookups() {
        let tables = SymbolTables::global();
        assert_eq!(tables.widget("Panel").map(|w| w.tag), Some(17));
        let margin = tables.property("margin").unwrap();
        assert_eq!(margin.value_type, ValueType::Margins);
        assert_eq!(tables.property_by_id(margin.id).map(|p| p.name), Some("margin"));
        assert_eq!(tables.enumeration("stretch").map(|e| e.value), Some(7));
        assert_eq!(tables.enumeration_name(7), Some("stretch"));
        assert!(tables.widget("panel").is_none(), "lookup is case sensitive");
    }

    #[test]
    fn test_global_is_shared_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| SymbolTables::global() as *const SymbolTables as usize))
            .collect();
        let addresses: HashSet<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(addresses.len(), 1);
    }
}
