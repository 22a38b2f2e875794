//! End-to-end pipeline tests: a configuration file on disk, real drop
//! directories, the context-built engine, full runner cycles and the
//! KPI report on top.

use std::fs;
use std::path::PathBuf;

use revpipe::{ExportType, KpiReport, PipelineContext, Runner};
use revpipe_store::StoreEngine;

struct Deployment {
    root: tempfile::TempDir,
    config_path: PathBuf,
}

impl Deployment {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let config = serde_json::json!({
            "source_type": "local",
            "source_config": {
                "inventory_path": root.path().join("drop/inventory"),
                "inventory_column_separator": ",",
                "inventory_row_separator": "\n",
                "reservations_path": root.path().join("drop/reservations"),
            },
            "db_config": {
                "engine": "sqlite",
                "db_path": root.path().join("data/revpipe.db"),
            },
            "archive_path": root.path().join("archive"),
        });
        let config_path = root.path().join("config.json");
        fs::write(&config_path, config.to_string()).unwrap();
        fs::create_dir_all(root.path().join("drop/inventory")).unwrap();
        fs::create_dir_all(root.path().join("drop/reservations")).unwrap();
        Self { root, config_path }
    }

    fn context(&self, read_only: bool) -> PipelineContext {
        PipelineContext::init(&self.config_path, read_only).unwrap()
    }

    fn drop_file(&self, relative: &str, content: &str) {
        fs::write(self.root.path().join(relative), content).unwrap();
    }

    fn run_cycle(&self) {
        let context = self.context(false);
        Runner::new(&context.config, context.engine.as_ref()).run().unwrap();
    }

    fn count(&self, query: &str) -> i64 {
        let context = self.context(true);
        context
            .engine
            .execute(query, false)
            .unwrap()
            .into_table()
            .unwrap()
            .cell(0, "n")
            .unwrap()
            .as_integer()
            .unwrap()
    }

    fn archive_names(&self, sub: &str) -> Vec<String> {
        let dir = self.root.path().join("archive").join(sub);
        if !dir.is_dir() {
            return Vec::new();
        }
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

const INVENTORY_CSV: &str = "hotel_id,room_type_id,quantity\n1,RT1,2\n1,RT2,2\n";

fn reservations_doc() -> String {
    r#"{"data": [{
        "hotel_id": "1",
        "reservation_id": "RES-1",
        "status": "confirmed",
        "arrival_date": "2025-05-10",
        "departure_date": "2025-05-12",
        "created_at": "2025-05-01 10:00:00.000000",
        "updated_at": "2025-05-01 11:00:00.000000",
        "stay_dates": [{
            "start_date": "2025-05-10",
            "end_date": "2025-05-11",
            "room_type_id": "RT1",
            "room_type_name": "Double",
            "number_of_adults": 2,
            "number_of_children": 0,
            "room_revenue_gross_amount": 240.0,
            "room_revenue_net_amount": 200.0
        }]
    }]}"#
        .to_string()
}

#[test]
fn full_cycle_ingests_and_archives() {
    let deployment = Deployment::new();
    deployment.drop_file("drop/inventory/inv.csv", INVENTORY_CSV);
    deployment.drop_file("drop/reservations/res.json", &reservations_doc());

    deployment.run_cycle();

    assert_eq!(deployment.count("SELECT COUNT(*) AS n FROM inventory WHERE is_active = 1"), 2);
    assert_eq!(deployment.count("SELECT COUNT(*) AS n FROM reservation_imports"), 1);
    assert_eq!(deployment.count("SELECT COUNT(*) AS n FROM reservation_stay_dates"), 1);
    assert_eq!(deployment.archive_names("success").len(), 2);
    assert!(deployment.archive_names("tmp").is_empty());
}

#[test]
fn repeated_cycles_stay_idempotent() {
    let deployment = Deployment::new();
    deployment.drop_file("drop/reservations/res.json", &reservations_doc());
    deployment.run_cycle();

    deployment.drop_file("drop/reservations/res_copy.json", &reservations_doc());
    deployment.run_cycle();

    assert_eq!(deployment.count("SELECT COUNT(*) AS n FROM reservation_imports"), 1);
    assert_eq!(deployment.count("SELECT COUNT(*) AS n FROM reservation_stay_dates"), 1);
}

#[test]
fn kpi_report_exports_csv_from_the_view() {
    let deployment = Deployment::new();
    deployment.drop_file("drop/inventory/inv.csv", INVENTORY_CSV);
    deployment.drop_file("drop/reservations/res.json", &reservations_doc());
    deployment.run_cycle();

    let context = deployment.context(true);
    let export_dir = deployment.root.path().join("reports");
    let report = KpiReport {
        start_date: "2025-05-01".parse().unwrap(),
        end_date: "2025-05-31".parse().unwrap(),
        hotel_id: 1,
        exclude_dates: Vec::new(),
        export_type: ExportType::Csv,
        export_path: export_dir.clone(),
    };
    let path = report.run(&context).unwrap();

    assert_eq!(
        path.file_name().unwrap().to_string_lossy(),
        "kpi_1_2025_05_01_to_2025_05_31.csv"
    );
    let content = fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next().unwrap(),
        "NIGHT_OF_STAY,OCCUPANCY_PERCENTAGE,TOTAL_NET_REVENUE,ADR"
    );
    // One stay-date covering nights 10 and 11 out of 4 rooms: 25%.
    let body: Vec<&str> = lines.collect();
    assert_eq!(body.len(), 2);
    assert!(body[0].starts_with("2025-05-10,25.00,200.00,200.00"));
    assert!(body[1].starts_with("2025-05-11,25.00,200.00,200.00"));
}

#[test]
fn kpi_report_respects_excluded_nights() {
    let deployment = Deployment::new();
    deployment.drop_file("drop/inventory/inv.csv", INVENTORY_CSV);
    deployment.drop_file("drop/reservations/res.json", &reservations_doc());
    deployment.run_cycle();

    let context = deployment.context(true);
    let report = KpiReport {
        start_date: "2025-05-01".parse().unwrap(),
        end_date: "2025-05-31".parse().unwrap(),
        hotel_id: 1,
        exclude_dates: vec!["2025-05-11".parse().unwrap()],
        export_type: ExportType::Csv,
        export_path: deployment.root.path().join("reports"),
    };
    let path = report.run(&context).unwrap();
    let content = fs::read_to_string(path).unwrap();
    assert!(content.contains("2025-05-10"));
    assert!(!content.contains("2025-05-11"));
}

#[test]
fn error_files_never_reach_the_store() {
    let deployment = Deployment::new();
    deployment.drop_file("drop/inventory/one.csv", INVENTORY_CSV);
    deployment.drop_file("drop/inventory/two.csv", INVENTORY_CSV);
    deployment.drop_file("drop/reservations/broken.json", "{oops");

    deployment.run_cycle();

    assert_eq!(deployment.count("SELECT COUNT(*) AS n FROM inventory"), 0);
    assert_eq!(deployment.count("SELECT COUNT(*) AS n FROM reservation_imports"), 0);
    assert_eq!(deployment.archive_names("error").len(), 3);
    assert!(deployment.archive_names("success").is_empty());
}
