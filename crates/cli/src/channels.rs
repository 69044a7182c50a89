//! Channel tables on disk (CSV).
//!
//! Columns: `family, slab_min, slab_max, top_edge, bottom_edge,
//! valid_spacings, tension_capacity, shear_capacity`. `valid_spacings` is a
//! `;`-separated list of bracket centres in mm, e.g. `300;350;400`.

use anyhow::{anyhow, bail, Context, Result};
use bracket_opt::api::{ChannelRow, ChannelSpec, TableCatalog};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

const FLOAT_COLUMNS: [&str; 6] = [
    "slab_min",
    "slab_max",
    "top_edge",
    "bottom_edge",
    "tension_capacity",
    "shear_capacity",
];

fn parse_spacings(raw: &str) -> Result<Vec<u32>> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .with_context(|| format!("bad spacing {s:?} in {raw:?}"))
        })
        .collect()
}

/// Load a catalog from CSV. Rows keep file order (first match wins).
pub fn load_catalog(path: &Path) -> Result<TableCatalog> {
    let mut exprs = vec![
        col("family").cast(DataType::String),
        col("valid_spacings").cast(DataType::String),
    ];
    exprs.extend(FLOAT_COLUMNS.iter().map(|c| col(*c).cast(DataType::Float64)));
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .finish()
        .with_context(|| format!("opening {}", path.display()))?
        .select(exprs)
        .collect()
        .with_context(|| format!("reading channel table {}", path.display()))?;

    let family = df.column("family")?.str()?;
    let spacings = df.column("valid_spacings")?.str()?;
    let floats = FLOAT_COLUMNS
        .iter()
        .map(|c| Ok(df.column(c)?.f64()?.clone()))
        .collect::<PolarsResult<Vec<Float64Chunked>>>()?;
    let value = |j: usize, i: usize| -> Result<f64> {
        floats[j]
            .get(i)
            .ok_or_else(|| anyhow!("row {i}: missing {}", FLOAT_COLUMNS[j]))
    };

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let name = family
            .get(i)
            .ok_or_else(|| anyhow!("row {i}: missing family"))?;
        let spacing = parse_spacings(spacings.get(i).unwrap_or(""))?;
        if spacing.is_empty() {
            bail!("row {i}: no valid spacings for {name}");
        }
        rows.push(ChannelRow {
            family: name.to_string(),
            slab_min: value(0, i)?,
            slab_max: value(1, i)?,
            spec: ChannelSpec {
                top_edge: value(2, i)?,
                bottom_edge: value(3, i)?,
                valid_spacings: spacing,
                tension_capacity: value(4, i)?,
                shear_capacity: value(5, i)?,
            },
        });
    }
    tracing::info!(rows = rows.len(), path = %path.display(), "channel table loaded");
    Ok(TableCatalog::new(rows))
}

/// Write `catalog` as CSV in the layout [`load_catalog`] reads.
pub fn save_catalog(catalog: &TableCatalog, path: &Path) -> Result<()> {
    let rows = catalog.rows();
    let float = |f: fn(&ChannelRow) -> f64| rows.iter().map(f).collect::<Vec<f64>>();
    let mut df = df!(
        "family" => rows.iter().map(|r| r.family.clone()).collect::<Vec<_>>(),
        "slab_min" => float(|r| r.slab_min),
        "slab_max" => float(|r| r.slab_max),
        "top_edge" => float(|r| r.spec.top_edge),
        "bottom_edge" => float(|r| r.spec.bottom_edge),
        "valid_spacings" => rows
            .iter()
            .map(|r| {
                r.spec
                    .valid_spacings
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(";")
            })
            .collect::<Vec<_>>(),
        "tension_capacity" => float(|r| r.spec.tension_capacity),
        "shear_capacity" => float(|r| r.spec.shear_capacity)
    )?;
    crate::ensure_parent(path)?;
    let mut file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
