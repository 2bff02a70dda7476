//! The static resource table. Adding a resource means adding a descriptor
//! here, a table to `schema.sql`, and an entry in [`ALL`].

use crate::model::{Column, Dependent, ResourceDescriptor, Rule, View};

pub const CATEGORY_KINDS: &[&str] = &["income", "expense"];

pub static NOTES: ResourceDescriptor = ResourceDescriptor {
    name: "Note",
    path: "notes",
    table: "notes",
    columns: &[Column::text("title").required(), Column::text("content")],
    view: None,
    order_by: "updated_at DESC, id DESC",
    touch_updated_at: true,
    dependents: &[],
};

pub static FINANCE_CATEGORIES: ResourceDescriptor = ResourceDescriptor {
    name: "Category",
    path: "finance/categories",
    table: "finance_categories",
    columns: &[
        Column::text("name").required(),
        Column::text("kind").required().rules(&[Rule::OneOf(CATEGORY_KINDS)]),
    ],
    view: None,
    order_by: "created_at DESC, id DESC",
    touch_updated_at: false,
    dependents: &[Dependent {
        table: "finance_transactions",
        foreign_key: "category_id",
        message: "Cannot delete category with existing transactions",
    }],
};

pub static FINANCE_TRANSACTIONS: ResourceDescriptor = ResourceDescriptor {
    name: "Transaction",
    path: "finance/transactions",
    table: "finance_transactions",
    columns: &[
        Column::integer("category_id").required(),
        Column::real("amount").required().rules(&[Rule::Positive]),
        Column::text("date").required().rules(&[Rule::IsoDate]),
        Column::text("note"),
    ],
    view: Some(View {
        select: "SELECT t.*, c.name AS category_name, c.kind AS category_kind \
                 FROM finance_transactions t \
                 JOIN finance_categories c ON t.category_id = c.id",
        id_column: "t.id",
    }),
    order_by: "t.date DESC, t.created_at DESC, t.id DESC",
    touch_updated_at: false,
    dependents: &[],
};

pub static FITNESS_WORKOUTS: ResourceDescriptor = ResourceDescriptor {
    name: "Workout",
    path: "fitness/workouts",
    table: "fitness_workouts",
    columns: &[
        Column::text("date").required().rules(&[Rule::IsoDate]),
        Column::text("note"),
    ],
    view: None,
    order_by: "date DESC, created_at DESC, id DESC",
    touch_updated_at: false,
    dependents: &[],
};

pub static MEAL_RECIPES: ResourceDescriptor = ResourceDescriptor {
    name: "Recipe",
    path: "meal/recipes",
    table: "meal_recipes",
    columns: &[
        Column::text("title").required(),
        Column::text("ingredients"),
        Column::text("steps"),
    ],
    view: None,
    order_by: "created_at DESC, id DESC",
    touch_updated_at: false,
    dependents: &[],
};

pub static MEAL_PLANS: ResourceDescriptor = ResourceDescriptor {
    name: "Meal plan",
    path: "meal/plans",
    table: "meal_plans",
    columns: &[
        Column::text("date").required().rules(&[Rule::IsoDate]),
        Column::text("note"),
    ],
    view: None,
    order_by: "date DESC, created_at DESC, id DESC",
    touch_updated_at: false,
    dependents: &[],
};

pub static PC_PARTS: ResourceDescriptor = ResourceDescriptor {
    name: "Part",
    path: "pc/parts",
    table: "pc_parts_plan",
    columns: &[
        Column::text("category").required(),
        Column::text("part_name").required(),
        Column::text("store"),
        Column::real("price"),
        Column::text("url"),
        Column::text("note"),
    ],
    view: None,
    order_by: "created_at DESC, id DESC",
    touch_updated_at: false,
    dependents: &[],
};

// status stays free text; the frontend offers
// ordered|shipped|delivered|returned|cancelled.
pub static PC_ORDERS: ResourceDescriptor = ResourceDescriptor {
    name: "Order",
    path: "pc/orders",
    table: "pc_orders",
    columns: &[
        Column::text("item").required(),
        Column::text("date").required().rules(&[Rule::IsoDate]),
        Column::text("store").required(),
        Column::real("price"),
        Column::text("status").default_text("ordered"),
        Column::text("courier"),
        Column::text("tracking_number"),
        Column::text("note"),
    ],
    view: None,
    order_by: "date DESC, created_at DESC, id DESC",
    touch_updated_at: false,
    dependents: &[],
};

pub static ALL: [&ResourceDescriptor; 8] = [
    &NOTES,
    &FINANCE_CATEGORIES,
    &FINANCE_TRANSACTIONS,
    &FITNESS_WORKOUTS,
    &MEAL_RECIPES,
    &MEAL_PLANS,
    &PC_PARTS,
    &PC_ORDERS,
];
