/// Column names of the bronze and silver record layouts
pub mod columns {
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "phone";
    pub const AGE: &str = "age";
    pub const SALARY: &str = "salary";
    pub const ADDRESS: &str = "address";
    pub const SIGNUP_DATE: &str = "signup_date";
    pub const STATUS: &str = "status";

    /// Columns the cleaner requires on its input
    pub const REQUIRED: [&str; 8] = [NAME, EMAIL, PHONE, AGE, SALARY, ADDRESS, SIGNUP_DATE, STATUS];

    /// Columns the aggregator requires on its input
    pub const AGGREGATION_REQUIRED: [&str; 5] = [STATUS, SIGNUP_DATE, AGE, SALARY, EMAIL];

    // Derived gold columns
    pub const SIGNUP_YEAR: &str = "signup_year";
    pub const SIGNUP_MONTH: &str = "signup_month";
    pub const AGE_GROUP: &str = "age_group";
    pub const USER_COUNT: &str = "user_count";
    pub const AVG_AGE: &str = "avg_age";
    pub const AVG_SALARY: &str = "avg_salary";
    pub const MEDIAN_SALARY: &str = "median_salary";
    pub const SALARY_STD: &str = "salary_std";
    pub const YEAR: &str = "year";
    pub const NEW_USERS: &str = "new_users";
    pub const GROWTH_PCT: &str = "growth_pct";
    pub const TOTAL_USERS: &str = "total_users";
}

/// Gold table names, in the order they are produced
pub mod tables {
    pub const ACTIVE_USERS: &str = "active_users";
    pub const TIME_ANALYTICS: &str = "time_analytics";
    pub const DEMOGRAPHIC_ANALYTICS: &str = "demographic_analytics";
    pub const STATUS_SUMMARY: &str = "status_summary";
    pub const YEARLY_GROWTH: &str = "yearly_growth";
    pub const EXEC_DASHBOARD: &str = "exec_dashboard";

    pub const ALL: [&str; 6] = [
        ACTIVE_USERS,
        TIME_ANALYTICS,
        DEMOGRAPHIC_ANALYTICS,
        STATUS_SUMMARY,
        YEARLY_GROWTH,
        EXEC_DASHBOARD,
    ];
}

// Layer names double as object-store prefixes and local sub-directories
pub const BRONZE_LAYER: &str = "bronze";
pub const SILVER_LAYER: &str = "silver";
pub const GOLD_LAYER: &str = "gold";
pub const LAYERS: [&str; 3] = [BRONZE_LAYER, SILVER_LAYER, GOLD_LAYER];

pub const ACTIVE_STATUS: &str = "Active";
pub const UNKNOWN_PLACEHOLDER: &str = "Unknown";
pub const UNKNOWN_AGE_SENTINEL: i64 = -1;
