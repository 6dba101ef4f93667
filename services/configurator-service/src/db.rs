// =============================================================================
// DATABASE MODULE
// =============================================================================
// PostgreSQL access for the configurator:
// - products: the read-only catalog the selection engine works against
// - saved_configurations: calculated results, stored as JSON documents
//
// Tags (category, technology, accessory kind) are stored as TEXT and parsed
// when rows are turned into a CatalogSnapshot.
// =============================================================================

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use uuid::Uuid;

use crate::catalog::CatalogSnapshot;
use crate::models::{
    AccessoryKind, ConfigurationResult, ConfigurationSummary, Product, ProductCategory,
    ProductRow, SavedConfiguration, TechnologyTag,
};

const PRODUCT_COLUMNS: &str = r#"
    id, name, brand, model, category, technology, price,
    short_description, description, resolution_mp, ir_range_m, outdoor,
    smart_detection, poe_budget_w, channels, max_bandwidth_mbps, disk_bays,
    ports, storage_tb, roll_length_m, ups_va, accessory_kind
"#;

// -----------------------------------------------------------------------------
// DATABASE WRAPPER
// -----------------------------------------------------------------------------
#[derive(Clone)]
pub struct Database {
    /// SQLx PostgreSQL connection pool
    pool: PgPool,
}

impl Database {
    // -------------------------------------------------------------------------
    // CONNECTION
    // -------------------------------------------------------------------------
    /// Create a new database connection pool
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(2)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .idle_timeout(std::time::Duration::from_secs(300))
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        Ok(Self { pool })
    }

    // -------------------------------------------------------------------------
    // MIGRATIONS
    // -------------------------------------------------------------------------
    /// Create tables and indexes if missing, then seed the sample catalog.
    ///
    /// Safe to run on every startup.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name VARCHAR(255) NOT NULL,
                brand VARCHAR(100),
                model VARCHAR(100),

                -- camera / recorder / switch / cable / disk / ups / accessory
                category VARCHAR(32) NOT NULL,
                -- ip_poe / wifi / analog / universal
                technology VARCHAR(32) NOT NULL DEFAULT 'universal',
                price NUMERIC(12, 2) NOT NULL,

                short_description TEXT,
                description TEXT,

                -- Technical attributes, NULL when not applicable
                resolution_mp INTEGER,
                ir_range_m INTEGER,
                outdoor BOOLEAN,
                smart_detection BOOLEAN NOT NULL DEFAULT FALSE,
                poe_budget_w INTEGER,
                channels INTEGER,
                max_bandwidth_mbps INTEGER,
                disk_bays INTEGER,
                ports INTEGER,
                storage_tb DOUBLE PRECISION,
                roll_length_m INTEGER,
                ups_va INTEGER,
                accessory_kind VARCHAR(32),

                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT non_negative_price CHECK (price >= 0)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create products table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_category ON products(category)")
            .execute(&self.pool)
            .await
            .context("Failed to create category index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS saved_configurations (
                id UUID PRIMARY KEY,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                total_cameras INTEGER NOT NULL,
                total_price NUMERIC(12, 2) NOT NULL,

                -- Full ConfigurationResult, including the questionnaire
                result_json TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create saved_configurations table")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_saved_configurations_created
            ON saved_configurations(created_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create saved_configurations index")?;

        self.seed_sample_catalog().await?;

        Ok(())
    }

    /// Insert the sample catalog when the products table is empty.
    async fn seed_sample_catalog(&self) -> Result<()> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        if count.0 > 0 {
            return Ok(());
        }

        let products = sample_catalog();
        let mut tx = self.pool.begin().await?;
        for product in &products {
            sqlx::query(
                r#"
                INSERT INTO products (
                    id, name, brand, model, category, technology, price,
                    short_description, description, resolution_mp, ir_range_m, outdoor,
                    smart_detection, poe_budget_w, channels, max_bandwidth_mbps, disk_bays,
                    ports, storage_tb, roll_length_m, ups_va, accessory_kind
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                        $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
                "#,
            )
            .bind(product.id)
            .bind(&product.name)
            .bind(&product.brand)
            .bind(&product.model)
            .bind(product.category.as_ref())
            .bind(product.technology.as_ref())
            .bind(product.price)
            .bind(&product.short_description)
            .bind(&product.description)
            .bind(to_db(product.resolution_mp))
            .bind(to_db(product.ir_range_m))
            .bind(product.outdoor)
            .bind(product.smart_detection)
            .bind(to_db(product.poe_budget_w))
            .bind(to_db(product.channels))
            .bind(to_db(product.max_bandwidth_mbps))
            .bind(to_db(product.disk_bays))
            .bind(to_db(product.ports))
            .bind(product.storage_tb)
            .bind(to_db(product.roll_length_m))
            .bind(to_db(product.ups_va))
            .bind(product.accessory_kind.map(|k| k.as_ref().to_string()))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to seed product {}", product.name))?;
        }
        tx.commit().await?;

        tracing::info!(products = products.len(), "Seeded sample catalog");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // CATALOG
    // -------------------------------------------------------------------------

    /// All product rows in a stable order (category, name, id).
    pub async fn load_product_rows(&self) -> Result<Vec<ProductRow>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY category, name, id");
        sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch products")
    }

    /// Load and validate the full catalog.
    pub async fn load_catalog(&self) -> Result<CatalogSnapshot> {
        let rows = self.load_product_rows().await?;
        Ok(CatalogSnapshot::from_rows(rows))
    }

    /// A single product, `None` if missing or invalid.
    pub async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch product")?;

        Ok(row.and_then(|row| match Product::try_from(row) {
            Ok(product) => Some(product),
            Err(e) => {
                tracing::warn!(product_id = %id, error = %e, "Stored product is invalid");
                None
            }
        }))
    }

    // -------------------------------------------------------------------------
    // SAVED CONFIGURATIONS
    // -------------------------------------------------------------------------

    /// Persist a calculated result and return its new id.
    pub async fn save_configuration(&self, result: &ConfigurationResult) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let document =
            serde_json::to_string(result).context("Failed to serialize configuration")?;
        let total_cameras = i32::try_from(result.input.total_cameras()).unwrap_or(i32::MAX);

        sqlx::query(
            r#"
            INSERT INTO saved_configurations (id, total_cameras, total_price, result_json)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(total_cameras)
        .bind(result.total_price())
        .bind(document)
        .execute(&self.pool)
        .await
        .context("Failed to save configuration")?;

        Ok(id)
    }

    /// Load a saved configuration document.
    pub async fn get_configuration(&self, id: Uuid) -> Result<Option<SavedConfiguration>> {
        let row = sqlx::query(
            r#"
            SELECT id, created_at, total_price, result_json
            FROM saved_configurations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch configuration")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let document: String = row.get("result_json");
        let result: ConfigurationResult = serde_json::from_str(&document)
            .with_context(|| format!("Stored configuration {id} is not readable"))?;
        let total_price: Decimal = row.get("total_price");

        Ok(Some(SavedConfiguration {
            id: row.get("id"),
            created_at: row.get("created_at"),
            total_price,
            result,
        }))
    }

    /// Most recent saved configurations, newest first.
    pub async fn list_configurations(&self, limit: i64) -> Result<Vec<ConfigurationSummary>> {
        sqlx::query_as::<_, ConfigurationSummary>(
            r#"
            SELECT id, created_at, total_cameras, total_price
            FROM saved_configurations
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list configurations")
    }

    // -------------------------------------------------------------------------
    // HEALTH CHECK
    // -------------------------------------------------------------------------

    /// Check if database connection is healthy
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

fn to_db(value: Option<u32>) -> Option<i32> {
    value.and_then(|v| i32::try_from(v).ok())
}

// =============================================================================
// SAMPLE CATALOG
// =============================================================================
/// Products seeded into an empty database.
///
/// Enough to fill every line for the default questionnaire in each camera
/// technology.
pub fn sample_catalog() -> Vec<Product> {
    use ProductCategory::*;
    use TechnologyTag::*;

    let item = |name: &str, brand: &str, category, technology, price: Decimal| Product {
        brand: Some(brand.to_string()),
        ..Product::new(name, category, technology, price)
    };
    let camera = |name: &str, brand: &str, tech, price: i64, mp, ir, outdoor, watts| Product {
        resolution_mp: Some(mp),
        ir_range_m: Some(ir),
        outdoor: Some(outdoor),
        poe_budget_w: Some(watts),
        ..item(name, brand, Camera, tech, Decimal::from(price))
    };
    let accessory = |name: &str, brand: &str, kind, price: Decimal| Product {
        accessory_kind: Some(kind),
        ..item(name, brand, Accessory, Universal, price)
    };

    vec![
        // ----- Cameras -----
        Product {
            model: Some("DS-2CD1043G2-I".into()),
            short_description: Some("4 MP bullet, 30 m IR, IP67".into()),
            ..camera("Hikvision Bullet 4MP", "Hikvision", IpPoe, 329, 4, 30, true, 5)
        },
        Product {
            model: Some("DS-2CD1143G2-I".into()),
            short_description: Some("4 MP dome, 30 m IR".into()),
            ..camera("Hikvision Dome 4MP", "Hikvision", IpPoe, 289, 4, 30, false, 5)
        },
        Product {
            smart_detection: true,
            model: Some("IPC-HFW2441S-S".into()),
            ..camera("Dahua WizSense Bullet 4MP", "Dahua", IpPoe, 449, 4, 30, true, 6)
        },
        Product {
            smart_detection: true,
            model: Some("IPC-HDW2441T-S".into()),
            ..camera("Dahua WizSense Dome 4MP", "Dahua", IpPoe, 419, 4, 30, false, 6)
        },
        Product {
            smart_detection: true,
            model: Some("DS-2CD2087G2-LU".into()),
            short_description: Some("8 MP ColorVu, colour at night".into()),
            ..camera("Hikvision ColorVu Bullet 8MP", "Hikvision", IpPoe, 899, 8, 40, true, 7)
        },
        camera("Imou Cruiser 4MP", "Imou", Wifi, 399, 4, 30, true, 6),
        camera("Imou Ranger 2 4MP", "Imou", Wifi, 189, 4, 10, false, 4),
        camera("Hikvision Turbo HD Bullet 2MP", "Hikvision", Analog, 159, 2, 25, true, 4),
        camera("Hikvision Turbo HD Bullet 5MP", "Hikvision", Analog, 219, 5, 40, true, 5),
        camera("Hikvision Turbo HD Dome 5MP", "Hikvision", Analog, 189, 5, 30, false, 4),
        // ----- Recorders -----
        Product {
            channels: Some(8),
            max_bandwidth_mbps: Some(80),
            disk_bays: Some(1),
            model: Some("DS-7608NI-Q1/8P".into()),
            ..item("Hikvision NVR 8ch PoE", "Hikvision", Recorder, IpPoe, Decimal::from(749))
        },
        Product {
            channels: Some(16),
            max_bandwidth_mbps: Some(160),
            disk_bays: Some(2),
            model: Some("DS-7616NI-Q2".into()),
            ..item("Hikvision NVR 16ch", "Hikvision", Recorder, IpPoe, Decimal::from(1099))
        },
        Product {
            channels: Some(8),
            disk_bays: Some(1),
            model: Some("XVR5108HS-I3".into()),
            ..item("Dahua XVR 8ch", "Dahua", Recorder, Analog, Decimal::from(529))
        },
        Product {
            channels: Some(8),
            max_bandwidth_mbps: Some(64),
            disk_bays: Some(1),
            ..item("Imou Wi-Fi NVR 8ch", "Imou", Recorder, Wifi, Decimal::from(399))
        },
        // ----- Disks -----
        Product {
            storage_tb: Some(2.0),
            ..item("WD Purple 2TB", "Western Digital", Disk, Universal, Decimal::from(319))
        },
        Product {
            storage_tb: Some(4.0),
            ..item("WD Purple 4TB", "Western Digital", Disk, Universal, Decimal::from(499))
        },
        Product {
            storage_tb: Some(8.0),
            ..item("WD Purple 8TB", "Western Digital", Disk, Universal, Decimal::from(1099))
        },
        // ----- Switches -----
        Product {
            ports: Some(8),
            poe_budget_w: Some(57),
            ..item("TP-Link PoE Switch 8 port", "TP-Link", Switch, IpPoe, Decimal::from(229))
        },
        Product {
            ports: Some(16),
            poe_budget_w: Some(150),
            ..item("Ubiquiti PoE Switch 16 port", "Ubiquiti", Switch, IpPoe, Decimal::from(1199))
        },
        // ----- Cables -----
        Product {
            roll_length_m: Some(305),
            short_description: Some("Cat5e outdoor, gel-filled".into()),
            ..item("UTP Cat5e outdoor 305 m", "Netrack", Cable, IpPoe, Decimal::from(549))
        },
        Product {
            roll_length_m: Some(100),
            ..item("Coax + power cable 100 m", "Libox", Cable, Analog, Decimal::from(219))
        },
        Product {
            roll_length_m: Some(100),
            ..item("Power cable 2x0.75 100 m", "Elektrokabel", Cable, Wifi, Decimal::from(129))
        },
        // ----- Accessories -----
        accessory("Camera junction box", "Hikvision", AccessoryKind::Mount, Decimal::from(39)),
        accessory("Mounting screws 50 pcs", "Rawlplug", AccessoryKind::Fixings, Decimal::from(19)),
        accessory("Cable tray 1 m", "Kopos", AccessoryKind::Tray, Decimal::new(850, 2)),
        accessory("Hikvision 22\" monitor", "Hikvision", AccessoryKind::Monitor, Decimal::from(549)),
        accessory("HDMI cable 10 m", "Unitek", AccessoryKind::Tv, Decimal::from(59)),
        // ----- UPS -----
        Product {
            ups_va: Some(650),
            ..item("EAST UPS 650VA", "EAST", Ups, Universal, Decimal::from(299))
        },
        Product {
            ups_va: Some(1200),
            ..item("APC Back-UPS 1200VA", "APC", Ups, Universal, Decimal::from(749))
        },
    ]
}
