//! GeoPackage (SQLite) point-layer writer.
//!
//! Produces a minimal OGC GeoPackage 1.2 container: the three required
//! metadata tables, the EPSG:4326 spatial reference, and one feature table
//! per imported CSV with a `geom` POINT column in GeoPackage binary encoding.

use crate::app::ports::{PointImportReport, PointImportRequest, SpatialImporterPort};
use crate::common::constants::WGS84_SRS_ID;
use crate::common::error::{FacilityError, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 'GPKG'
const GPKG_APPLICATION_ID: i32 = 0x4750_4B47;
/// GeoPackage 1.2
const GPKG_USER_VERSION: i32 = 10200;
const GEOMETRY_COLUMN: &str = "geom";

const WGS84_WKT: &str = concat!(
    r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,"#,
    r#"AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,"#,
    r#"AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,"#,
    r#"AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#
);

const SCHEMA: &str = r#"
    CREATE TABLE gpkg_spatial_ref_sys (
        srs_name                 TEXT NOT NULL,
        srs_id                   INTEGER NOT NULL PRIMARY KEY,
        organization             TEXT NOT NULL,
        organization_coordsys_id INTEGER NOT NULL,
        definition               TEXT NOT NULL,
        description              TEXT
    );
    CREATE TABLE gpkg_contents (
        table_name  TEXT NOT NULL PRIMARY KEY,
        data_type   TEXT NOT NULL,
        identifier  TEXT UNIQUE,
        description TEXT DEFAULT '',
        last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
        min_x       DOUBLE,
        min_y       DOUBLE,
        max_x       DOUBLE,
        max_y       DOUBLE,
        srs_id      INTEGER,
        CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
    );
    CREATE TABLE gpkg_geometry_columns (
        table_name         TEXT NOT NULL,
        column_name        TEXT NOT NULL,
        geometry_type_name TEXT NOT NULL,
        srs_id             INTEGER NOT NULL,
        z                  TINYINT NOT NULL,
        m                  TINYINT NOT NULL,
        CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name),
        CONSTRAINT uk_gc_table_name UNIQUE (table_name),
        CONSTRAINT fk_gc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
        CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
    );
"#;

/// Encodes a 2D point as a GeoPackage geometry blob: the `GP` header
/// (version 0, little-endian, no envelope) followed by a WKB point.
pub fn point_blob(x: f64, y: f64, srs_id: i32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(29);
    buf.extend_from_slice(b"GP");
    buf.push(0);
    buf.push(0b0000_0001);
    buf.extend_from_slice(&srs_id.to_le_bytes());
    buf.push(1);
    buf.extend_from_slice(&1u32.to_le_bytes());
    buf.extend_from_slice(&x.to_le_bytes());
    buf.extend_from_slice(&y.to_le_bytes());
    buf
}

/// Decodes a blob written by [`point_blob`] into `(x, y)`.
pub fn decode_point_blob(blob: &[u8]) -> Option<(f64, f64)> {
    if blob.len() != 29 || &blob[0..2] != b"GP" || blob[3] & 0b0000_1110 != 0 {
        return None;
    }
    let x = f64::from_le_bytes(blob[13..21].try_into().ok()?);
    let y = f64::from_le_bytes(blob[21..29].try_into().ok()?);
    Some((x, y))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn validate_layer_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if valid_start
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.to_lowercase().starts_with("gpkg_")
    {
        Ok(())
    } else {
        Err(FacilityError::Import(format!("invalid layer name '{name}'")))
    }
}

/// Decimal degrees within WGS 84 bounds
fn parse_coordinate(raw: &str, limit: f64) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    (value.is_finite() && value.abs() <= limit).then_some(value)
}

#[derive(Default)]
struct Bounds {
    min_x: Option<f64>,
    min_y: Option<f64>,
    max_x: Option<f64>,
    max_y: Option<f64>,
}

impl Bounds {
    fn include(&mut self, x: f64, y: f64) {
        self.min_x = Some(self.min_x.map_or(x, |v| v.min(x)));
        self.min_y = Some(self.min_y.map_or(y, |v| v.min(y)));
        self.max_x = Some(self.max_x.map_or(x, |v| v.max(x)));
        self.max_y = Some(self.max_y.map_or(y, |v| v.max(y)));
    }
}

/// Writes point layers into `<output_dir>/<database_name>.gpkg`
pub struct GeoPackageImporter {
    path: PathBuf,
}

impl GeoPackageImporter {
    pub fn new(output_dir: &Path, database_name: &str) -> Self {
        Self {
            path: output_dir.join(format!("{database_name}.gpkg")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Feature tables registered in the container
    pub fn layers(&self) -> Result<Vec<String>> {
        let conn = Connection::open(&self.path)?;
        let mut stmt = conn.prepare(
            "SELECT table_name FROM gpkg_contents WHERE data_type = 'features' ORDER BY table_name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn create_container(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(&format!(
            "PRAGMA application_id = {GPKG_APPLICATION_ID}; PRAGMA user_version = {GPKG_USER_VERSION};"
        ))?;
        conn.execute_batch(SCHEMA)?;
        conn.execute(
            "INSERT INTO gpkg_spatial_ref_sys VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                "Undefined cartesian SRS",
                -1,
                "NONE",
                -1,
                "undefined",
                "undefined cartesian coordinate reference system"
            ],
        )?;
        conn.execute(
            "INSERT INTO gpkg_spatial_ref_sys VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                "Undefined geographic SRS",
                0,
                "NONE",
                0,
                "undefined",
                "undefined geographic coordinate reference system"
            ],
        )?;
        conn.execute(
            "INSERT INTO gpkg_spatial_ref_sys VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                "WGS 84 geodetic",
                WGS84_SRS_ID,
                "EPSG",
                WGS84_SRS_ID,
                WGS84_WKT,
                "longitude/latitude coordinates in decimal degrees on the WGS 84 spheroid"
            ],
        )?;
        Ok(conn)
    }

    fn open_or_create(&self) -> Result<Connection> {
        if self.path.exists() {
            Ok(Connection::open(&self.path)?)
        } else {
            self.create_container()
        }
    }
}

impl SpatialImporterPort for GeoPackageImporter {
    fn reset(&self) -> Result<()> {
        if self.path.exists() {
            info!(path = %self.path.display(), "Deleting existing GeoPackage");
            fs::remove_file(&self.path)?;
        }
        self.create_container()?;
        info!(path = %self.path.display(), "GeoPackage created");
        Ok(())
    }

    fn import_points(&self, request: &PointImportRequest) -> Result<PointImportReport> {
        validate_layer_name(&request.layer_name)?;

        let mut rdr = csv::Reader::from_path(&request.csv_path)?;
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let column = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                FacilityError::Import(format!(
                    "column '{}' not found in {}",
                    name,
                    request.csv_path.display()
                ))
            })
        };
        let lat_idx = column(&request.latitude_field)?;
        let lon_idx = column(&request.longitude_field)?;

        let layer = quote_ident(&request.layer_name);
        let columns: Vec<String> = headers.iter().map(|h| quote_ident(h)).collect();

        let mut conn = self.open_or_create()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM gpkg_geometry_columns WHERE table_name = ?1",
            params![request.layer_name],
        )?;
        tx.execute(
            "DELETE FROM gpkg_contents WHERE table_name = ?1",
            params![request.layer_name],
        )?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {layer};
             CREATE TABLE {layer} (
                 fid INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                 {GEOMETRY_COLUMN} POINT,
                 {}
             );",
            columns
                .iter()
                .map(|c| format!("{c} TEXT"))
                .collect::<Vec<_>>()
                .join(", ")
        ))?;

        let mut features = 0;
        let mut skipped = 0;
        let mut bounds = Bounds::default();
        {
            let placeholders = (0..=headers.len())
                .map(|i| format!("?{}", i + 1))
                .collect::<Vec<_>>()
                .join(", ");
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {layer} ({GEOMETRY_COLUMN}, {}) VALUES ({placeholders})",
                columns.join(", ")
            ))?;

            for (line, record) in rdr.records().enumerate() {
                let record = record?;
                let lat = record.get(lat_idx).and_then(|v| parse_coordinate(v, 90.0));
                let lon = record.get(lon_idx).and_then(|v| parse_coordinate(v, 180.0));
                let (Some(lat), Some(lon)) = (lat, lon) else {
                    debug!(row = line + 1, "Skipping row without usable coordinates");
                    skipped += 1;
                    continue;
                };
                bounds.include(lon, lat);

                let mut values = Vec::with_capacity(headers.len() + 1);
                values.push(SqlValue::Blob(point_blob(lon, lat, WGS84_SRS_ID)));
                values.extend((0..headers.len()).map(|i| {
                    SqlValue::Text(record.get(i).unwrap_or_default().to_string())
                }));
                insert.execute(params_from_iter(values))?;
                features += 1;
            }
        }

        tx.execute(
            "INSERT INTO gpkg_contents
                (table_name, data_type, identifier, description, min_x, min_y, max_x, max_y, srs_id)
             VALUES (?1, 'features', ?1, '', ?2, ?3, ?4, ?5, ?6)",
            params![
                request.layer_name,
                bounds.min_x,
                bounds.min_y,
                bounds.max_x,
                bounds.max_y,
                WGS84_SRS_ID
            ],
        )?;
        tx.execute(
            "INSERT INTO gpkg_geometry_columns VALUES (?1, ?2, 'POINT', ?3, 0, 0)",
            params![request.layer_name, GEOMETRY_COLUMN, WGS84_SRS_ID],
        )?;
        tx.commit()?;

        if skipped > 0 {
            warn!(
                layer = %request.layer_name,
                skipped,
                "Rows without usable coordinates were not imported"
            );
        }
        info!(layer = %request.layer_name, features, "Point layer created");

        Ok(PointImportReport {
            database: self.path.clone(),
            layer_name: request.layer_name.clone(),
            features,
            skipped,
        })
    }
}
