//! Service names and table names shared by bootstrap, repositories and web

/// Names services are registered under
pub mod services {
    pub const LOGGER: &str = "Logger";
    pub const DATABASE_CLIENT: &str = "DatabaseClient";
    /// Legacy alias for the database client
    pub const DB_ALIAS: &str = "DB";

    pub const PRODUCT_REPOSITORY: &str = "ProductRepository";
    pub const USER_REPOSITORY: &str = "UserRepository";
    pub const ORDER_REPOSITORY: &str = "OrderRepository";
    pub const PAYMENT_REPOSITORY: &str = "PaymentRepository";
    pub const PAYMENT_METHOD_REPOSITORY: &str = "PaymentMethodRepository";
    pub const OCCASION_REPOSITORY: &str = "OccasionRepository";
    pub const SETTINGS_REPOSITORY: &str = "SettingsRepository";
    pub const PRODUCT_IMAGE_REPOSITORY: &str = "ProductImageRepository";

    pub const REPOSITORIES: [&str; 8] = [
        PRODUCT_REPOSITORY,
        USER_REPOSITORY,
        ORDER_REPOSITORY,
        PAYMENT_REPOSITORY,
        PAYMENT_METHOD_REPOSITORY,
        OCCASION_REPOSITORY,
        SETTINGS_REPOSITORY,
        PRODUCT_IMAGE_REPOSITORY,
    ];
}

/// Document tables backing the repositories
pub mod tables {
    pub const USERS: &str = "users";
    pub const PRODUCTS: &str = "products";
    pub const ORDERS: &str = "orders";
    pub const PAYMENTS: &str = "payments";
    pub const PAYMENT_METHODS: &str = "payment_methods";
    pub const OCCASIONS: &str = "occasions";
    pub const SETTINGS: &str = "settings";
    pub const PRODUCT_IMAGES: &str = "product_images";

    pub const ALL: [&str; 8] = [
        USERS,
        PRODUCTS,
        ORDERS,
        PAYMENTS,
        PAYMENT_METHODS,
        OCCASIONS,
        SETTINGS,
        PRODUCT_IMAGES,
    ];
}
