//! Schema descriptors for every table the warehouse builds.
//!
//! Each dimension and fact is described once here and consumed by a single
//! generic builder in `dw-transform`. A descriptor names its base raw table,
//! which columns are hard requirements, which are optional, how foreign keys
//! resolve, and the fixed output projection.

use polars::prelude::DataType;

/// Output name of the derived calendar dimension.
pub const DIM_DATE: &str = "dim_date";

/// Output name of the assembled one-big-table.
pub const ONE_BIG_TABLE: &str = "one_big_table";

/// Logical column type used where the warehouse must materialize a column
/// that the data did not supply (all-null fill).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
    Boolean,
    Date,
}

impl ColumnKind {
    pub fn dtype(self) -> DataType {
        match self {
            Self::Integer => DataType::Int64,
            Self::Float => DataType::Float64,
            Self::Text => DataType::String,
            Self::Boolean => DataType::Boolean,
            Self::Date => DataType::Date,
        }
    }
}

/// A source column that may appear under alternative names.
///
/// The first present name among `name` and `aliases` is renamed to `name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRef {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

impl ColumnRef {
    pub const fn new(name: &'static str) -> Self {
        Self { name, aliases: &[] }
    }

    pub const fn with_aliases(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { name, aliases }
    }

    /// All accepted names, canonical first.
    pub fn candidates(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.name).chain(self.aliases.iter().copied())
    }
}

/// An enrichment join applied while building a dimension.
///
/// `columns` maps lookup column -> dimension column.
#[derive(Debug, Clone, Copy)]
pub struct Lookup {
    pub table: &'static str,
    pub key: &'static str,
    pub columns: &'static [(&'static str, &'static str)],
}

/// Descriptor for a surrogate-keyed dimension.
#[derive(Debug, Clone, Copy)]
pub struct DimensionSpec {
    /// Output table name (`dim_customer`).
    pub name: &'static str,
    /// Entity stem used for `<entity>_sk` / `<entity>_bk`.
    pub entity: &'static str,
    /// Base raw table.
    pub source: &'static str,
    /// Natural identifier in the base table.
    pub natural_key: &'static str,
    /// Base-table renames applied before enrichment.
    pub renames: &'static [(&'static str, &'static str)],
    pub lookups: &'static [Lookup],
    /// Output projection; absent columns are dropped.
    pub columns: &'static [&'static str],
    /// When set, an absent base table skips the dimension instead of failing.
    pub optional: bool,
}

impl DimensionSpec {
    pub fn surrogate_key(&self) -> String {
        format!("{}_sk", self.entity)
    }

    pub fn business_key(&self) -> String {
        format!("{}_bk", self.entity)
    }
}

/// A foreign key resolved against a dimension's business key.
#[derive(Debug, Clone, Copy)]
pub struct ForeignKey {
    /// Business-key column on the event table.
    pub column: &'static str,
    pub dimension: &'static DimensionSpec,
    /// Surrogate-key column produced on the fact.
    pub output: &'static str,
    /// Whether the column must exist on the base table.
    pub required: bool,
}

/// A date-valued column resolved against the calendar dimension.
#[derive(Debug, Clone, Copy)]
pub struct DateRef {
    pub column: ColumnRef,
    pub output: &'static str,
    pub required: bool,
}

/// A numeric measure, coerced to `Float64`.
#[derive(Debug, Clone, Copy)]
pub struct Measure {
    pub column: &'static str,
    /// Value used for nulls (and for an absent column) before derivations run.
    pub default: Option<f64>,
}

impl Measure {
    pub const fn new(column: &'static str) -> Self {
        Self {
            column,
            default: None,
        }
    }

    pub const fn defaulted(column: &'static str, default: f64) -> Self {
        Self {
            column,
            default: Some(default),
        }
    }
}

/// How a derived measure is computed from other columns of the same row.
#[derive(Debug, Clone, Copy)]
pub enum Formula {
    /// Sum of the listed measures.
    Sum(&'static [&'static str]),
    /// `quantity * unit_price - discount`.
    NetLine {
        quantity: &'static str,
        unit_price: &'static str,
        discount: &'static str,
    },
    /// Minutes elapsed between two timestamps.
    ElapsedMinutes {
        start: &'static str,
        end: &'static str,
    },
    /// Whole calendar days elapsed between two timestamps.
    ElapsedDays {
        start: &'static str,
        end: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct DerivedMeasure {
    pub target: &'static str,
    pub formula: Formula,
}

/// Descriptor for an event-grain fact table.
#[derive(Debug, Clone, Copy)]
pub struct FactSpec {
    pub name: &'static str,
    pub source: &'static str,
    /// Natural event key.
    pub key: ColumnRef,
    /// Key of the parent event, when this event belongs to one.
    pub parent_key: Option<&'static str>,
    pub foreign_keys: &'static [ForeignKey],
    pub dates: &'static [DateRef],
    pub measures: &'static [Measure],
    pub derived: &'static [DerivedMeasure],
    /// Degenerate descriptive columns carried as-is.
    pub attributes: &'static [&'static str],
    pub optional: bool,
}

impl FactSpec {
    /// Columns that must be non-null for a row to survive.
    pub fn identifying_columns(&self) -> Vec<&'static str> {
        let mut columns = vec![self.key.name];
        columns.extend(self.parent_key);
        columns
    }

    /// Fixed output projection, in order.
    pub fn output_columns(&self) -> Vec<&'static str> {
        let mut columns = self.identifying_columns();
        columns.extend(self.foreign_keys.iter().map(|fk| fk.output));
        columns.extend(self.dates.iter().map(|date| date.output));
        columns.extend(self.attributes.iter().copied());
        columns.extend(self.measures.iter().map(|measure| measure.column));
        for derived in self.derived {
            if !columns.contains(&derived.target) {
                columns.push(derived.target);
            }
        }
        columns
    }
}

/// One step of the OBT join plan.
///
/// The dimension's `right_key` is renamed to `left_key` before the join and
/// every brought-in column is renamed per `columns` (dimension column ->
/// output column), then prefixed with `<role>_` when a role is set.
#[derive(Debug, Clone, Copy)]
pub struct JoinStep {
    pub dimension: &'static str,
    pub left_key: &'static str,
    pub right_key: &'static str,
    pub role: Option<&'static str>,
    pub columns: &'static [(&'static str, &'static str)],
}

impl JoinStep {
    /// Output name for a brought-in column.
    pub fn output_name(&self, column: &str) -> String {
        match self.role {
            Some(role) => format!("{role}_{column}"),
            None => column.to_string(),
        }
    }
}

/// A column of the fixed OBT projection.
#[derive(Debug, Clone, Copy)]
pub struct ObtColumn {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn obt(name: &'static str, kind: ColumnKind) -> ObtColumn {
    ObtColumn { name, kind }
}

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

const PROVINCE_LOOKUP: Lookup = Lookup {
    table: "province",
    key: "province_id",
    columns: &[("name", "province_name"), ("code", "province_code")],
};

pub const CUSTOMER: DimensionSpec = DimensionSpec {
    name: "dim_customer",
    entity: "customer",
    source: "customer",
    natural_key: "customer_id",
    renames: &[],
    lookups: &[],
    columns: &[
        "customer_sk",
        "customer_bk",
        "email",
        "first_name",
        "last_name",
        "phone",
        "status",
        "created_at",
    ],
    optional: false,
};

pub const PRODUCT: DimensionSpec = DimensionSpec {
    name: "dim_product",
    entity: "product",
    source: "product",
    natural_key: "product_id",
    renames: &[],
    lookups: &[Lookup {
        table: "product_category",
        key: "category_id",
        columns: &[
            ("name", "category_name"),
            ("parent_id", "category_parent_id"),
        ],
    }],
    columns: &[
        "product_sk",
        "product_bk",
        "sku",
        "name",
        "list_price",
        "status",
        "created_at",
        "category_id",
        "category_name",
        "category_parent_id",
    ],
    optional: false,
};

pub const STORE: DimensionSpec = DimensionSpec {
    name: "dim_store",
    entity: "store",
    source: "store",
    natural_key: "store_id",
    renames: &[],
    lookups: &[
        Lookup {
            table: "address",
            key: "address_id",
            columns: &[("city", "city"), ("province_id", "province_id")],
        },
        PROVINCE_LOOKUP,
    ],
    columns: &[
        "store_sk",
        "store_bk",
        "name",
        "address_id",
        "city",
        "province_id",
        "province_name",
        "province_code",
        "active",
        "created_at",
    ],
    optional: false,
};

pub const CHANNEL: DimensionSpec = DimensionSpec {
    name: "dim_channel",
    entity: "channel",
    source: "channel",
    natural_key: "channel_id",
    renames: &[],
    lookups: &[],
    columns: &["channel_sk", "channel_bk", "code", "name"],
    optional: false,
};

pub const ADDRESS: DimensionSpec = DimensionSpec {
    name: "dim_address",
    entity: "address",
    source: "address",
    natural_key: "address_id",
    renames: &[],
    lookups: &[PROVINCE_LOOKUP],
    columns: &[
        "address_sk",
        "address_bk",
        "line1",
        "line2",
        "city",
        "province_id",
        "province_code",
        "province_name",
        "postal_code",
        "country_code",
        "created_at",
    ],
    optional: false,
};

pub const PROVINCE: DimensionSpec = DimensionSpec {
    name: "dim_province",
    entity: "province",
    source: "province",
    natural_key: "province_id",
    renames: &[("name", "province_name"), ("code", "province_code")],
    lookups: &[],
    columns: &[
        "province_sk",
        "province_bk",
        "province_name",
        "province_code",
    ],
    optional: true,
};

/// Every surrogate-keyed dimension, in build order.
pub const DIMENSIONS: &[&DimensionSpec] =
    &[&CUSTOMER, &PRODUCT, &STORE, &CHANNEL, &ADDRESS, &PROVINCE];

/// Calendar dimension columns, in output order.
pub const DATE_COLUMNS: &[&str] = &[
    "date_sk",
    "date",
    "day",
    "month",
    "year",
    "quarter",
    "week_number",
    "day_name",
    "month_name",
    "is_weekend",
    "year_month",
    "month_date",
];

// ---------------------------------------------------------------------------
// Facts
// ---------------------------------------------------------------------------

pub const SALES_ORDER: FactSpec = FactSpec {
    name: "fact_sales_order",
    source: "sales_order",
    key: ColumnRef::new("order_id"),
    parent_key: None,
    foreign_keys: &[
        ForeignKey {
            column: "customer_id",
            dimension: &CUSTOMER,
            output: "customer_sk",
            required: true,
        },
        ForeignKey {
            column: "channel_id",
            dimension: &CHANNEL,
            output: "channel_sk",
            required: false,
        },
        ForeignKey {
            column: "store_id",
            dimension: &STORE,
            output: "store_sk",
            required: false,
        },
        ForeignKey {
            column: "billing_address_id",
            dimension: &ADDRESS,
            output: "billing_address_sk",
            required: false,
        },
        ForeignKey {
            column: "shipping_address_id",
            dimension: &ADDRESS,
            output: "shipping_address_sk",
            required: false,
        },
    ],
    dates: &[DateRef {
        column: ColumnRef::new("order_date"),
        output: "order_date_sk",
        required: true,
    }],
    measures: &[
        Measure::new("subtotal"),
        Measure::defaulted("tax_amount", 0.0),
        Measure::defaulted("shipping_fee", 0.0),
        Measure::new("total_amount"),
    ],
    derived: &[DerivedMeasure {
        target: "total_amount",
        formula: Formula::Sum(&["subtotal", "tax_amount", "shipping_fee"]),
    }],
    attributes: &["status", "currency_code"],
    optional: false,
};

pub const SALES_ORDER_ITEM: FactSpec = FactSpec {
    name: "fact_sales_order_item",
    source: "sales_order_item",
    key: ColumnRef::new("order_item_id"),
    parent_key: Some("order_id"),
    foreign_keys: &[ForeignKey {
        column: "product_id",
        dimension: &PRODUCT,
        output: "product_sk",
        required: true,
    }],
    dates: &[],
    measures: &[
        Measure::new("quantity"),
        Measure::new("unit_price"),
        Measure::defaulted("discount_amount", 0.0),
        Measure::new("line_total"),
    ],
    derived: &[DerivedMeasure {
        target: "line_total",
        formula: Formula::NetLine {
            quantity: "quantity",
            unit_price: "unit_price",
            discount: "discount_amount",
        },
    }],
    attributes: &[],
    optional: false,
};

pub const PAYMENT: FactSpec = FactSpec {
    name: "fact_payment",
    source: "payment",
    key: ColumnRef::new("payment_id"),
    parent_key: Some("order_id"),
    foreign_keys: &[],
    dates: &[DateRef {
        column: ColumnRef::new("paid_at"),
        output: "paid_date_sk",
        required: false,
    }],
    measures: &[Measure::new("amount")],
    derived: &[],
    attributes: &["method", "status", "transaction_ref"],
    optional: true,
};

pub const SHIPMENT: FactSpec = FactSpec {
    name: "fact_shipment",
    source: "shipment",
    key: ColumnRef::new("shipment_id"),
    parent_key: Some("order_id"),
    foreign_keys: &[],
    dates: &[
        DateRef {
            column: ColumnRef::new("shipped_at"),
            output: "shipped_date_sk",
            required: false,
        },
        DateRef {
            column: ColumnRef::new("delivered_at"),
            output: "delivered_date_sk",
            required: false,
        },
    ],
    measures: &[],
    derived: &[DerivedMeasure {
        target: "delivery_days",
        formula: Formula::ElapsedDays {
            start: "shipped_at",
            end: "delivered_at",
        },
    }],
    attributes: &["carrier", "tracking_number", "status"],
    optional: true,
};

pub const WEB_SESSION: FactSpec = FactSpec {
    name: "fact_web_session",
    source: "web_session",
    key: ColumnRef::new("session_id"),
    parent_key: None,
    foreign_keys: &[ForeignKey {
        column: "customer_id",
        dimension: &CUSTOMER,
        output: "customer_sk",
        required: false,
    }],
    dates: &[
        DateRef {
            column: ColumnRef::new("started_at"),
            output: "start_date_sk",
            required: false,
        },
        DateRef {
            column: ColumnRef::new("ended_at"),
            output: "end_date_sk",
            required: false,
        },
    ],
    measures: &[],
    derived: &[DerivedMeasure {
        target: "duration_minutes",
        formula: Formula::ElapsedMinutes {
            start: "started_at",
            end: "ended_at",
        },
    }],
    attributes: &["source", "device"],
    optional: true,
};

pub const NPS_RESPONSE: FactSpec = FactSpec {
    name: "fact_nps_response",
    source: "nps_response",
    key: ColumnRef::with_aliases("response_id", &["nps_id", "id"]),
    parent_key: None,
    foreign_keys: &[
        ForeignKey {
            column: "customer_id",
            dimension: &CUSTOMER,
            output: "customer_sk",
            required: false,
        },
        ForeignKey {
            column: "channel_id",
            dimension: &CHANNEL,
            output: "channel_sk",
            required: false,
        },
    ],
    dates: &[DateRef {
        column: ColumnRef::with_aliases("response_date", &["responded_at", "created_at"]),
        output: "response_date_sk",
        required: false,
    }],
    measures: &[Measure::new("score")],
    derived: &[],
    attributes: &["comment"],
    optional: true,
};

/// Every fact, in build order.
pub const FACTS: &[&FactSpec] = &[
    &SALES_ORDER,
    &SALES_ORDER_ITEM,
    &PAYMENT,
    &SHIPMENT,
    &WEB_SESSION,
    &NPS_RESPONSE,
];

// ---------------------------------------------------------------------------
// One big table
// ---------------------------------------------------------------------------

const ADDRESS_ROLE_COLUMNS: &[(&str, &str)] = &[
    ("city", "city"),
    ("postal_code", "postal_code"),
    ("province_id", "province_id"),
];

const PROVINCE_ROLE_COLUMNS: &[(&str, &str)] = &[
    ("province_name", "province_name"),
    ("province_code", "province_code"),
];

/// The OBT join plan, executed in order after the order-line/order-header join.
pub const OBT_JOIN_PLAN: &[JoinStep] = &[
    JoinStep {
        dimension: DIM_DATE,
        left_key: "order_date_sk",
        right_key: "date_sk",
        role: None,
        columns: &[
            ("date", "date"),
            ("year", "year"),
            ("quarter", "quarter"),
            ("month", "month"),
            ("month_name", "month_name"),
            ("day", "day"),
            ("day_name", "day_name"),
            ("week_number", "week_number"),
            ("year_month", "year_month"),
            ("is_weekend", "is_weekend"),
        ],
    },
    JoinStep {
        dimension: "dim_product",
        left_key: "product_sk",
        right_key: "product_sk",
        role: None,
        columns: &[
            ("product_bk", "product_bk"),
            ("sku", "sku"),
            ("name", "product_name"),
            ("category_name", "category_name"),
        ],
    },
    JoinStep {
        dimension: "dim_customer",
        left_key: "customer_sk",
        right_key: "customer_sk",
        role: None,
        columns: &[
            ("customer_bk", "customer_bk"),
            ("first_name", "customer_first_name"),
            ("last_name", "customer_last_name"),
            ("email", "customer_email"),
        ],
    },
    JoinStep {
        dimension: "dim_channel",
        left_key: "channel_sk",
        right_key: "channel_sk",
        role: None,
        columns: &[("code", "channel_code"), ("name", "channel_name")],
    },
    JoinStep {
        dimension: "dim_store",
        left_key: "store_sk",
        right_key: "store_sk",
        role: None,
        columns: &[("name", "store_name"), ("address_id", "store_address_id")],
    },
    JoinStep {
        dimension: "dim_address",
        left_key: "store_address_id",
        right_key: "address_bk",
        role: Some("store"),
        columns: ADDRESS_ROLE_COLUMNS,
    },
    JoinStep {
        dimension: "dim_address",
        left_key: "billing_address_sk",
        right_key: "address_sk",
        role: Some("billing"),
        columns: ADDRESS_ROLE_COLUMNS,
    },
    JoinStep {
        dimension: "dim_address",
        left_key: "shipping_address_sk",
        right_key: "address_sk",
        role: Some("shipping"),
        columns: ADDRESS_ROLE_COLUMNS,
    },
    JoinStep {
        dimension: "dim_province",
        left_key: "store_province_id",
        right_key: "province_bk",
        role: Some("store"),
        columns: PROVINCE_ROLE_COLUMNS,
    },
    JoinStep {
        dimension: "dim_province",
        left_key: "billing_province_id",
        right_key: "province_bk",
        role: Some("billing"),
        columns: PROVINCE_ROLE_COLUMNS,
    },
    JoinStep {
        dimension: "dim_province",
        left_key: "shipping_province_id",
        right_key: "province_bk",
        role: Some("shipping"),
        columns: PROVINCE_ROLE_COLUMNS,
    },
];

/// Fixed, typed OBT projection.
pub const OBT_COLUMNS: &[ObtColumn] = &[
    obt("order_item_id", ColumnKind::Text),
    obt("order_id", ColumnKind::Text),
    obt("order_date_sk", ColumnKind::Integer),
    obt("date", ColumnKind::Date),
    obt("year", ColumnKind::Integer),
    obt("quarter", ColumnKind::Integer),
    obt("month", ColumnKind::Integer),
    obt("month_name", ColumnKind::Text),
    obt("day", ColumnKind::Integer),
    obt("day_name", ColumnKind::Text),
    obt("week_number", ColumnKind::Integer),
    obt("year_month", ColumnKind::Text),
    obt("is_weekend", ColumnKind::Boolean),
    obt("customer_sk", ColumnKind::Integer),
    obt("customer_bk", ColumnKind::Text),
    obt("customer_first_name", ColumnKind::Text),
    obt("customer_last_name", ColumnKind::Text),
    obt("customer_email", ColumnKind::Text),
    obt("channel_sk", ColumnKind::Integer),
    obt("channel_code", ColumnKind::Text),
    obt("channel_name", ColumnKind::Text),
    obt("store_sk", ColumnKind::Integer),
    obt("store_name", ColumnKind::Text),
    obt("store_city", ColumnKind::Text),
    obt("store_province_name", ColumnKind::Text),
    obt("store_province_code", ColumnKind::Text),
    obt("billing_address_sk", ColumnKind::Integer),
    obt("billing_city", ColumnKind::Text),
    obt("billing_postal_code", ColumnKind::Text),
    obt("billing_province_name", ColumnKind::Text),
    obt("billing_province_code", ColumnKind::Text),
    obt("shipping_address_sk", ColumnKind::Integer),
    obt("shipping_city", ColumnKind::Text),
    obt("shipping_postal_code", ColumnKind::Text),
    obt("shipping_province_name", ColumnKind::Text),
    obt("shipping_province_code", ColumnKind::Text),
    obt("product_sk", ColumnKind::Integer),
    obt("product_bk", ColumnKind::Text),
    obt("sku", ColumnKind::Text),
    obt("product_name", ColumnKind::Text),
    obt("category_name", ColumnKind::Text),
    obt("quantity", ColumnKind::Float),
    obt("unit_price", ColumnKind::Float),
    obt("discount_amount", ColumnKind::Float),
    obt("line_total", ColumnKind::Float),
    obt("status", ColumnKind::Text),
    obt("currency_code", ColumnKind::Text),
    obt("subtotal", ColumnKind::Float),
    obt("tax_amount", ColumnKind::Float),
    obt("shipping_fee", ColumnKind::Float),
    obt("total_amount", ColumnKind::Float),
    obt("payment_amount", ColumnKind::Float),
    obt("nps_score", ColumnKind::Float),
    obt("is_valid_sale", ColumnKind::Boolean),
    obt("sales_amount", ColumnKind::Float),
];
