pub const COOKING_TIME_MIN: i32 = 1;
pub const COOKING_TIME_MAX: i32 = 1000;

pub const AMOUNT_MIN: i32 = 1;
pub const AMOUNT_MAX: i32 = 1000;

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_HOURS: i64 = 1;

pub const SHOPPING_LIST_FILE_NAME: &str = "shopping_list";
pub const SHOPPING_LIST_DOC_TITLE: &str = "Shopping list";
pub const SHOPPING_LIST_CONTENT_TYPE: &str = "application/pdf";
pub const SHOPPING_LIST_CONTENT_DISPOSITION: &str =
    "attachment; filename=\"shopping_list.pdf\"";

/* A4 in PDF points */
pub const PAGE_WIDTH: f64 = 595.0;
pub const PAGE_HEIGHT: f64 = 842.0;

pub const FONT_SIZE_TITLE: f64 = 24.0;
pub const FONT_SIZE_SUB_TITLE: f64 = 16.0;
pub const FONT_SIZE_INGREDIENTS: f64 = 12.0;

pub const Y_FOR_TITLE: f64 = 790.0;
pub const Y_FOR_SUB_TITLE: f64 = 760.0;
pub const Y_FOR_RULE: f64 = 740.0;
pub const Y_FOR_INGREDIENTS: f64 = 710.0;
pub const Y_PAGE_BOTTOM: f64 = 50.0;
pub const X_FOR_INGREDIENTS: f64 = 50.0;
pub const X_FOR_RULE_START: f64 = 50.0;
pub const X_FOR_RULE_END: f64 = 545.0;
pub const LINE_STEP: f64 = 25.0;
