//! Chart display configuration
//!
//! `chartConfig` is tagged on `type`. The three kinds that reference fields
//! get typed payloads; any other kind is carried as raw JSON and passed
//! through. Every typed record keeps its unrecognised keys in `extra`.
//!
//! | type | rewritten |
//! |------|-----------|
//! | `table` | keys of `config.columns` |
//! | `cartesian` | `layout.xField`, `layout.yField[*]`, `eChartsConfig.series[*].encode.{xRef,yRef}.field` |
//! | `big_number` | `config.selectedField` |
//!
//! Conditional formatting on tables is never rewritten.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::field::Field;
use crate::rule::RenameRule;

const TABLE: &str = "table";
const CARTESIAN: &str = "cartesian";
const BIG_NUMBER: &str = "big_number";

/// Display configuration of a saved chart
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawChartConfig")]
pub enum ChartConfig {
    /// `type: "table"`
    Table(ChartVariant<TableConfig>),
    /// `type: "cartesian"`
    Cartesian(ChartVariant<CartesianConfig>),
    /// `type: "big_number"`
    BigNumber(ChartVariant<BigNumberConfig>),
    /// Any other chart kind; never rewritten
    Other {
        /// The `type` discriminator as stored
        kind: String,
        /// Untyped `config` payload
        config: Field<Value>,
        /// Sibling keys of `type` and `config`
        extra: Map<String, Value>,
    },
}

/// Kind-specific payload plus sibling keys
#[derive(Debug, Clone, PartialEq)]
pub struct ChartVariant<C> {
    /// `config` payload
    pub config: Field<C>,
    /// Sibling keys of `type` and `config`
    pub extra: Map<String, Value>,
}

impl<C> ChartVariant<C> {
    /// Variant with a config and no sibling keys
    #[inline]
    #[must_use]
    pub fn new(config: C) -> Self {
        Self {
            config: Field::Value(config),
            extra: Map::new(),
        }
    }

    fn map_config(&self, f: impl FnOnce(&C) -> C) -> Self {
        Self {
            config: self.config.as_ref().map(f),
            extra: self.extra.clone(),
        }
    }
}

#[derive(Deserialize)]
struct RawChartConfig {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    config: Field<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<RawChartConfig> for ChartConfig {
    type Error = serde_json::Error;

    fn try_from(raw: RawChartConfig) -> Result<Self, Self::Error> {
        fn typed<C: serde::de::DeserializeOwned>(
            config: Field<Value>,
            extra: Map<String, Value>,
        ) -> Result<ChartVariant<C>, serde_json::Error> {
            Ok(ChartVariant {
                config: config.try_map(serde_json::from_value)?,
                extra,
            })
        }

        Ok(match raw.kind.as_str() {
            TABLE => Self::Table(typed(raw.config, raw.extra)?),
            CARTESIAN => Self::Cartesian(typed(raw.config, raw.extra)?),
            BIG_NUMBER => Self::BigNumber(typed(raw.config, raw.extra)?),
            _ => Self::Other {
                kind: raw.kind,
                config: raw.config,
                extra: raw.extra,
            },
        })
    }
}

impl Serialize for ChartConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Tagged<'a, C: Serialize> {
            #[serde(rename = "type")]
            kind: &'a str,
            #[serde(skip_serializing_if = "Field::is_absent")]
            config: Field<&'a C>,
            #[serde(flatten)]
            extra: &'a Map<String, Value>,
        }

        fn tagged<'a, C: Serialize>(kind: &'a str, v: &'a ChartVariant<C>) -> Tagged<'a, C> {
            Tagged {
                kind,
                config: v.config.as_ref(),
                extra: &v.extra,
            }
        }

        match self {
            Self::Table(v) => tagged(TABLE, v).serialize(serializer),
            Self::Cartesian(v) => tagged(CARTESIAN, v).serialize(serializer),
            Self::BigNumber(v) => tagged(BIG_NUMBER, v).serialize(serializer),
            Self::Other {
                kind,
                config,
                extra,
            } => Tagged {
                kind,
                config: config.as_ref(),
                extra,
            }
            .serialize(serializer),
        }
    }
}

impl ChartConfig {
    /// The `type` discriminator
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Table(_) => TABLE,
            Self::Cartesian(_) => CARTESIAN,
            Self::BigNumber(_) => BIG_NUMBER,
            Self::Other { kind, .. } => kind,
        }
    }
}

/// `config` of a table chart
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    /// Per-column display settings keyed by field id
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub columns: Field<Map<String, Value>>,
    /// Conditional formatting rules; carried verbatim
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub conditional_formattings: Field<Value>,
    /// Other keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `config` of a cartesian chart
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartesianConfig {
    /// Axis field assignment
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub layout: Field<CartesianLayout>,
    /// Rendering options
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub e_charts_config: Field<EChartsConfig>,
    /// Other keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Which fields drive the x and y axes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartesianLayout {
    /// Field on the x axis
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub x_field: Field<String>,
    /// Fields on the y axis
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub y_field: Field<Vec<String>>,
    /// Other keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Chart rendering options
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EChartsConfig {
    /// One entry per plotted series
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub series: Field<Vec<Series>>,
    /// Other keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A plotted series
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Series {
    /// Field references for each axis
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub encode: Field<SeriesEncode>,
    /// Other keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Axis references of a series
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesEncode {
    /// x axis reference
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub x_ref: Field<FieldRef>,
    /// y axis reference
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub y_ref: Field<FieldRef>,
    /// Other keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reference to a field, optionally pivoted
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldRef {
    /// Field id
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub field: Field<String>,
    /// Other keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `config` of a big number chart
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BigNumberConfig {
    /// The single displayed field
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub selected_field: Field<String>,
    /// Other keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TableConfig {
    fn rewrite(&self, rule: &RenameRule) -> Self {
        Self {
            columns: self.columns.as_ref().map(|c| rule.rewrite_keys(c)),
            conditional_formattings: self.conditional_formattings.clone(),
            extra: self.extra.clone(),
        }
    }
}

impl CartesianConfig {
    fn rewrite(&self, rule: &RenameRule) -> Self {
        Self {
            layout: self.layout.as_ref().map(|layout| CartesianLayout {
                x_field: rule.rewrite_field(&layout.x_field),
                y_field: layout.y_field.as_ref().map(|ys| rule.rewrite_all(ys)),
                extra: layout.extra.clone(),
            }),
            e_charts_config: self.e_charts_config.as_ref().map(|echarts| EChartsConfig {
                series: echarts
                    .series
                    .as_ref()
                    .map(|series| series.iter().map(|s| s.rewrite(rule)).collect()),
                extra: echarts.extra.clone(),
            }),
            extra: self.extra.clone(),
        }
    }
}

impl Series {
    fn rewrite(&self, rule: &RenameRule) -> Self {
        Self {
            encode: self.encode.as_ref().map(|encode| SeriesEncode {
                x_ref: encode.x_ref.as_ref().map(|r| r.rewrite(rule)),
                y_ref: encode.y_ref.as_ref().map(|r| r.rewrite(rule)),
                extra: encode.extra.clone(),
            }),
            extra: self.extra.clone(),
        }
    }
}

impl FieldRef {
    fn rewrite(&self, rule: &RenameRule) -> Self {
        Self {
            field: rule.rewrite_field(&self.field),
            extra: self.extra.clone(),
        }
    }
}

impl BigNumberConfig {
    fn rewrite(&self, rule: &RenameRule) -> Self {
        Self {
            selected_field: rule.rewrite_field(&self.selected_field),
            extra: self.extra.clone(),
        }
    }
}

/// Rewrite the field references of a chart config
///
/// Unknown chart kinds are logged and returned unchanged.
#[must_use]
pub fn rewrite_chart_config(config: &ChartConfig, rule: &RenameRule) -> ChartConfig {
    match config {
        ChartConfig::Table(v) => ChartConfig::Table(v.map_config(|c| c.rewrite(rule))),
        ChartConfig::Cartesian(v) => ChartConfig::Cartesian(v.map_config(|c| c.rewrite(rule))),
        ChartConfig::BigNumber(v) => ChartConfig::BigNumber(v.map_config(|c| c.rewrite(rule))),
        ChartConfig::Other { kind, .. } => {
            tracing::warn!(chart_type = %kind, "unknown chart type, chart config left unchanged");
            config.clone()
        }
    }
}
