//! Test fixtures for database integration tests
//!
//! A small clinic schema: employees create care packages, care packages
//! have item details, and members buy packages.

#![allow(dead_code)]

use seedorder_catalog::MockDatabase;
use seedorder_core::{CellValue, TabularRow};

/// Mock database with the clinic tables and their foreign keys
pub fn clinic_database() -> MockDatabase {
    MockDatabase::builder()
        .table("employees")
        .foreign_key("care_packages", "created_by", "employees")
        .foreign_key("care_package_item_details", "care_package_id", "care_packages")
        .foreign_key("member_care_packages", "care_package_id", "care_packages")
        .foreign_key("member_care_packages", "employee_id", "employees")
        .build()
}

pub fn employee(id: u32, name: &str) -> TabularRow {
    TabularRow::new()
        .with("id", CellValue::Number(id as f64))
        .with("name", CellValue::Text(name.to_string()))
        .with("active", CellValue::Bool(true))
}

pub fn care_package(id: u32, created_by: u32) -> TabularRow {
    TabularRow::new()
        .with("id", CellValue::Number(id as f64))
        .with("name", CellValue::Text(format!("Package {}", id)))
        .with("created_by", CellValue::Number(created_by as f64))
}

pub fn item_detail(id: u32, care_package_id: u32) -> TabularRow {
    TabularRow::new()
        .with("id", CellValue::Number(id as f64))
        .with("care_package_id", CellValue::Number(care_package_id as f64))
        .with("quantity", CellValue::Number(1.0))
}

pub fn member_package(id: u32, care_package_id: u32, employee_id: Option<u32>) -> TabularRow {
    TabularRow::new()
        .with("id", CellValue::Number(id as f64))
        .with("care_package_id", CellValue::Number(care_package_id as f64))
        .with(
            "employee_id",
            employee_id
                .map(|e| CellValue::Number(e as f64))
                .unwrap_or(CellValue::Null),
        )
}
