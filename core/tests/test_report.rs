mod common;

use chrono::{DateTime, Duration, TimeZone, Utc};
use plantwatch_core::models::{Alert, AlertSeverity, EquipmentStatus, WaterQualitySample, WaterReading};
use plantwatch_core::report::{
    chemical_dosing, compliance_summary, cost_summary, efficiency_summary, parameter_averages,
    period_days, recommendations, render, write_readings_csv, ReportData, ReportKind,
};

use common::{degraded_sample, optimal_sample};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap()
}

fn reading(id: &str, sample: WaterQualitySample, score: Option<f64>) -> WaterReading {
    WaterReading { id: id.into(), sample, quality_score: score, created_at: t0() }
}

fn data(readings: Vec<WaterReading>, alerts: Vec<Alert>) -> ReportData {
    ReportData {
        readings,
        alerts,
        equipment: vec![],
        start: t0(),
        end: t0() + Duration::days(1),
    }
}

fn alert(severity: AlertSeverity) -> Alert {
    Alert { severity, message: "x".into(), created_at: t0() }
}

#[test]
fn averages_skip_unscored_readings_for_quality() {
    let rs = vec![
        reading("r1", optimal_sample(), Some(90.0)),
        reading("r2", degraded_sample(), None),
    ];
    let avg = parameter_averages(&rs).unwrap();
    assert!((avg.ph - 6.35).abs() < 1e-9);
    assert!((avg.turbidity - 40.0).abs() < 1e-9);
    assert_eq!(avg.quality_score, Some(90.0));
    assert!(parameter_averages(&[]).is_none());
}

#[test]
fn recommendations_follow_averages() {
    assert_eq!(recommendations(&[]), vec!["Insufficient data for recommendations."]);
    assert_eq!(
        recommendations(&[reading("r1", optimal_sample(), None)]),
        vec!["All parameters within optimal range", "Continue current treatment protocol"]
    );
    let bad = recommendations(&[reading("r1", degraded_sample(), None)]);
    assert_eq!(
        bad,
        vec![
            "Increase lime dosing to raise pH",
            "Increase coagulant dosing and check filters",
            "Increase aeration time/intensity",
        ]
    );
}

#[test]
fn dosing_scales_with_turbidity_and_acidity() {
    let d = chemical_dosing(&[reading("r1", degraded_sample(), None)]);
    assert!((d.coagulant_mg_l - 97.5).abs() < 1e-9);
    assert!((d.lime_mg_l - 20.0).abs() < 1e-9);
    assert!((d.coagulant_kg_day - 487.5).abs() < 1e-9);
    assert!((d.chlorine_kg_day - 12.5).abs() < 1e-9);
    // 97.5*5*25 + 20*5*8 + 2.5*5*45
    assert!((d.daily_cost - 13550.0).abs() < 1e-9);
    assert!((d.monthly_cost - 406500.0).abs() < 1e-9);

    // clear, neutral water: coagulant floor and no lime
    let d = chemical_dosing(&[]);
    assert_eq!(d.coagulant_mg_l, 10.0);
    assert_eq!(d.lime_mg_l, 0.0);
    assert_eq!(d.polymer_mg_l, 0.5);
}

#[test]
fn compliance_counts_and_certification() {
    let mut rs: Vec<_> = (0..19)
        .map(|i| reading(&format!("ok{i}"), optimal_sample(), None))
        .collect();
    rs.push(reading("bad", degraded_sample(), None));
    let d = data(
        rs,
        vec![alert(AlertSeverity::Critical), alert(AlertSeverity::Warning), alert(AlertSeverity::Warning)],
    );

    let c = compliance_summary(&d);
    assert_eq!((c.total, c.compliant), (20, 19));
    assert_eq!((c.ph_ok, c.turbidity_ok, c.do_ok, c.tds_ok), (19, 19, 19, 19));
    assert_eq!(c.rate, Some(95.0));
    assert!(c.certified());
    assert_eq!((c.critical_alerts, c.warning_alerts), (1, 2));

    let empty = compliance_summary(&data(vec![], vec![]));
    assert_eq!(empty.rate, None);
    assert!(!empty.certified());
}

#[test]
fn rendered_reports_carry_their_figures() {
    let d = data(vec![reading("r1", degraded_sample(), Some(30.0))], vec![alert(AlertSeverity::Critical)]);

    let daily = render(ReportKind::DailyQuality, &d);
    assert!(daily.starts_with("DAILY WATER QUALITY REPORT\n"));
    assert!(daily.contains("Period: 2024-05-01 - 2024-05-02"));
    assert!(daily.contains("pH Level: 5.50"));
    assert!(daily.contains("Overall Quality Score: 30.0%"));
    assert!(daily.contains("WARN: High TDS - check RO system"));
    assert!(daily.contains("- Increase aeration time/intensity"));

    let compliance = render(ReportKind::Compliance, &d);
    assert!(compliance.contains("Compliance Rate: 0.0%"));
    assert!(compliance.contains("Critical Violations: 1"));
    assert!(compliance.contains("WARN: ACTION REQUIRED"));

    let chemical = render(ReportKind::Chemical, &d);
    assert!(chemical.contains("Coagulant (PAC/Alum): 97.5 mg/L"));
    assert!(chemical.contains("- Lime: 100 kg/day"));
    assert!(chemical.contains("Daily Chemical Cost: ₹13550"));
    assert!(chemical.contains("Monthly Estimate: ₹406500"));

    let no_data = render(ReportKind::DailyQuality, &data(vec![], vec![]));
    assert_eq!(no_data, "No water quality data available for the selected period.");
}

#[test]
fn equipment_report_lists_schedule() {
    let mut d = data(vec![], vec![alert(AlertSeverity::Warning)]);
    d.equipment = vec![
        EquipmentStatus {
            equipment_name: "Intake Pump".into(),
            status: "running".into(),
            health_score: 87.4,
            next_maintenance: Some(t0() + Duration::days(10)),
        },
        EquipmentStatus {
            equipment_name: "Blower".into(),
            status: "idle".into(),
            health_score: 60.0,
            next_maintenance: None,
        },
    ];
    let text = render(ReportKind::Equipment, &d);
    assert!(text.contains("Warning Alerts: 1"));
    assert!(text.contains("Intake Pump: running (Health: 87%)"));
    assert!(text.contains("Intake Pump: Next maintenance on 2024-05-11"));
    assert!(!text.contains("Blower: Next maintenance"));
}

#[test]
fn csv_export_reads_back() {
    let rs = vec![
        reading("r1", optimal_sample(), Some(100.0)),
        reading("r2", degraded_sample(), None),
    ];
    let mut buf = Vec::new();
    write_readings_csv(&mut buf, &rs).unwrap();

    let mut rdr = csv::Reader::from_reader(buf.as_slice());
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(&headers[0], "id");
    assert_eq!(&headers[2], "ph");
    assert_eq!(headers.len(), 11);

    let rows: Vec<csv::StringRecord> = rdr.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "r1");
    assert_eq!(rows[1][2].parse::<f64>().unwrap(), 5.5);
    assert_eq!(&rows[0][10], "100.0");
    assert_eq!(&rows[1][10], "");

    let mut empty = Vec::new();
    write_readings_csv(&mut empty, &[]).unwrap();
    assert!(empty.is_empty());
}

fn equipment(name: &str, health: f64) -> EquipmentStatus {
    EquipmentStatus {
        equipment_name: name.into(),
        status: "running".into(),
        health_score: health,
        next_maintenance: None,
    }
}

#[test]
fn cost_scales_with_started_days() {
    assert_eq!(period_days(t0(), t0()), 1);
    assert_eq!(period_days(t0(), t0() + Duration::hours(24)), 1);
    assert_eq!(period_days(t0(), t0() + Duration::hours(36)), 2);
    assert_eq!(period_days(t0() + Duration::days(2), t0()), 1);

    let mut d = data(vec![], vec![]);
    d.end = t0() + Duration::hours(36);
    let c = cost_summary(&d);
    assert_eq!(c.days, 2);
    assert_eq!(c.chemical, 17000.0);
    assert_eq!(c.total(), 58000.0);
    assert!((c.share(c.energy) - 1200.0 / 29.0).abs() < 1e-9);

    let text = render(ReportKind::Cost, &d);
    assert!(text.starts_with("COST ANALYSIS REPORT\n"));
    assert!(text.contains("Duration: 2 days"));
    assert!(text.contains("TOTAL: ₹58000"));
    assert!(text.contains("Chemicals: 29.3%"));
    assert!(text.contains("WARN: Insufficient data for optimization analysis"));

    d.readings.push(reading("r1", optimal_sample(), None));
    assert!(render(ReportKind::Cost, &d).contains("OK: AI-optimized chemical dosing"));
}

#[test]
fn efficiency_averages_scores_and_health() {
    let mut d = data(
        vec![
            reading("r1", optimal_sample(), Some(80.0)),
            reading("r2", optimal_sample(), Some(100.0)),
            reading("r3", optimal_sample(), Some(0.0)),
            reading("r4", optimal_sample(), None),
        ],
        vec![],
    );
    d.equipment = vec![equipment("Intake Pump", 80.0), equipment("Blower", 90.0)];

    let e = efficiency_summary(&d);
    assert_eq!(e.quality, 90.0);
    assert_eq!(e.equipment_health, 85.0);
    assert_eq!(e.system(), 87.5);

    let text = render(ReportKind::Efficiency, &d);
    assert!(text.contains("System Efficiency: 87.5%"));
    assert!(text.contains("OK: Quality optimal"));
    assert!(text.contains("OK: Equipment in good condition"));

    // nothing recorded: plant defaults
    let empty = efficiency_summary(&data(vec![], vec![]));
    assert_eq!((empty.quality, empty.equipment_health), (85.0, 90.0));
    let text = render(ReportKind::Efficiency, &data(vec![], vec![]));
    assert!(text.contains("WARN: Quality below target"));
}
