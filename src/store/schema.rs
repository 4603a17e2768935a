pub const SCHEMA: &str = r#"
-- Asset categories; the name is the natural key
CREATE TABLE IF NOT EXISTS asset_types (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type_name TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS assets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    asset_code TEXT NOT NULL UNIQUE,
    asset_name TEXT NOT NULL,
    -- Deletion of a referenced type is refused by the store, not cascaded
    asset_type_id INTEGER REFERENCES asset_types(id),
    brand TEXT,
    model TEXT,
    serial_number TEXT,
    purchase_date TEXT,           -- YYYY-MM-DD
    purchase_price REAL,
    location TEXT,
    notes TEXT,
    status TEXT NOT NULL DEFAULT 'available'
        CHECK (status IN ('available', 'assigned', 'maintenance', 'retired')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS employees (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    employee_code TEXT NOT NULL UNIQUE,
    full_name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    department TEXT,
    position TEXT,
    phone TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- History of who held which asset. Rows are never deleted on their own; they
-- go with their asset or employee, which can only be deleted once returned.
CREATE TABLE IF NOT EXISTS assignments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    asset_id INTEGER NOT NULL REFERENCES assets(id) ON DELETE CASCADE,
    employee_id INTEGER NOT NULL REFERENCES employees(id) ON DELETE CASCADE,
    assigned_date TEXT NOT NULL,
    return_date TEXT,
    assigned_by TEXT,
    notes TEXT,
    status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'returned')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,  -- argon2id PHC string
    role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('admin', 'user')),
    employee_id INTEGER REFERENCES employees(id) ON DELETE SET NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Absence of a row means no access for non-admins
CREATE TABLE IF NOT EXISTS user_permissions (
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    entity_type TEXT NOT NULL,
    can_view INTEGER NOT NULL DEFAULT 0,
    can_edit INTEGER NOT NULL DEFAULT 0,
    can_delete INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, entity_type)
);

-- Audit trail; user_id is kept as a plain value so entries outlive their actor
CREATE TABLE IF NOT EXISTS activity_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER,
    username TEXT,
    action_type TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    entity_id INTEGER,
    entity_name TEXT,
    old_values TEXT,              -- JSON
    new_values TEXT,              -- JSON
    description TEXT,
    ip_address TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_assets_type ON assets(asset_type_id);
CREATE INDEX IF NOT EXISTS idx_assets_status ON assets(status);
CREATE INDEX IF NOT EXISTS idx_assignments_asset ON assignments(asset_id);
CREATE INDEX IF NOT EXISTS idx_assignments_employee ON assignments(employee_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_assignments_one_active
    ON assignments(asset_id) WHERE status = 'active';
CREATE INDEX IF NOT EXISTS idx_activity_logs_user ON activity_logs(user_id);
CREATE INDEX IF NOT EXISTS idx_activity_logs_entity ON activity_logs(entity_type, entity_id);
CREATE INDEX IF NOT EXISTS idx_activity_logs_created ON activity_logs(created_at);
"#;

/// Asset types seeded by `admin init`.
pub const DEFAULT_ASSET_TYPES: [(&str, &str); 8] = [
    ("Máy tính để bàn", "Desktop computers"),
    ("Laptop", "Portable computers"),
    ("Màn hình", "Monitors"),
    ("Máy in", "Printers and scanners"),
    ("Điện thoại", "Phones"),
    ("Máy tính bảng", "Tablets"),
    ("Thiết bị mạng", "Routers, switches and access points"),
    ("Khác", "Other equipment"),
];
