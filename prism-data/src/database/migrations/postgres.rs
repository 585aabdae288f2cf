use sqlx::PgPool;
use tracing::info;

/// Schema statements, applied in order. Each one is idempotent.
const SCHEMA: &[(&str, &str)] = &[
    (
        "accounts",
        "CREATE TABLE IF NOT EXISTS accounts (
            id UUID PRIMARY KEY,
            username VARCHAR(50) NOT NULL UNIQUE,
            full_name VARCHAR(120) NOT NULL,
            email VARCHAR(255),
            role VARCHAR(20) NOT NULL,
            password_hash TEXT NOT NULL,
            archived BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
    (
        "treatments",
        "CREATE TABLE IF NOT EXISTS treatments (
            id UUID PRIMARY KEY,
            name VARCHAR(120) NOT NULL,
            description TEXT,
            price BIGINT NOT NULL CHECK (price BETWEEN 0 AND 100000000000),
            duration_minutes INTEGER NOT NULL,
            archived BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
    (
        "packages",
        "CREATE TABLE IF NOT EXISTS packages (
            id UUID PRIMARY KEY,
            name VARCHAR(120) NOT NULL,
            description TEXT,
            price BIGINT NOT NULL CHECK (price BETWEEN 0 AND 100000000000),
            sessions INTEGER NOT NULL,
            treatment_ids UUID[] NOT NULL DEFAULT '{}',
            archived BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
    (
        "patient_records",
        "CREATE TABLE IF NOT EXISTS patient_records (
            id UUID PRIMARY KEY,
            patient_name VARCHAR(120) NOT NULL,
            contact_number VARCHAR(30) NOT NULL,
            email VARCHAR(255),
            age INTEGER,
            gender VARCHAR(20),
            address TEXT,
            person_in_charge VARCHAR(120) NOT NULL,
            treatment_id UUID REFERENCES treatments(id),
            package_id UUID REFERENCES packages(id),
            session_date DATE NOT NULL,
            total_amount BIGINT NOT NULL CHECK (total_amount BETWEEN 0 AND 100000000000),
            amount_paid BIGINT NOT NULL CHECK (amount_paid >= 0),
            payment_method VARCHAR(20) NOT NULL,
            notes TEXT,
            archived BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CHECK (amount_paid <= total_amount)
        )",
    ),
    (
        "staged_appointments",
        "CREATE TABLE IF NOT EXISTS staged_appointments (
            id UUID PRIMARY KEY,
            full_name VARCHAR(120) NOT NULL,
            contact_number VARCHAR(30) NOT NULL,
            email VARCHAR(255),
            preferred_date DATE NOT NULL,
            preferred_time TIME NOT NULL,
            treatment_id UUID REFERENCES treatments(id),
            package_id UUID REFERENCES packages(id),
            notes TEXT,
            status VARCHAR(20) NOT NULL DEFAULT 'pending',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
    (
        "appointments",
        "CREATE TABLE IF NOT EXISTS appointments (
            id UUID PRIMARY KEY,
            patient_record_id UUID REFERENCES patient_records(id),
            staged_appointment_id UUID REFERENCES staged_appointments(id),
            full_name VARCHAR(120) NOT NULL,
            appointment_date DATE NOT NULL,
            appointment_time TIME NOT NULL,
            treatment_id UUID REFERENCES treatments(id),
            package_id UUID REFERENCES packages(id),
            person_in_charge VARCHAR(120),
            notes TEXT,
            archived BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
    (
        "categories",
        "CREATE TABLE IF NOT EXISTS categories (
            id UUID PRIMARY KEY,
            name VARCHAR(80) NOT NULL,
            archived BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
    (
        "expenses",
        "CREATE TABLE IF NOT EXISTS expenses (
            id UUID PRIMARY KEY,
            category_id UUID NOT NULL REFERENCES categories(id),
            description TEXT NOT NULL,
            amount BIGINT NOT NULL CHECK (amount BETWEEN 1 AND 100000000000),
            expense_date DATE NOT NULL,
            archived BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
    (
        "sales",
        "CREATE TABLE IF NOT EXISTS sales (
            id UUID PRIMARY KEY,
            patient_record_id UUID REFERENCES patient_records(id),
            appointment_id UUID REFERENCES appointments(id),
            description TEXT NOT NULL,
            amount BIGINT NOT NULL CHECK (amount BETWEEN 1 AND 100000000000),
            payment_method VARCHAR(20) NOT NULL,
            sale_date DATE NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_patient_records_name ON patient_records (LOWER(patient_name))",
    "CREATE INDEX IF NOT EXISTS idx_staged_appointments_slot ON staged_appointments (preferred_date, preferred_time)",
    "CREATE INDEX IF NOT EXISTS idx_appointments_slot ON appointments (appointment_date, appointment_time)",
    "CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses (expense_date)",
    "CREATE INDEX IF NOT EXISTS idx_sales_date ON sales (sale_date)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_active_name ON categories (LOWER(name)) WHERE NOT archived",
];

/// Run PostgreSQL database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), String> {
    info!("Running PostgreSQL migrations");

    for (table, statement) in SCHEMA {
        info!("Creating {} table if not exists", table);
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| format!("Failed to create {}: {}", table, e))?;
    }

    for statement in INDEXES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| format!("Failed to create index: {}", e))?;
    }

    info!("PostgreSQL migrations completed successfully");
    Ok(())
}
