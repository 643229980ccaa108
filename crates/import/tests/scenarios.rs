use liasse_core::{BalanceEntry, Money, SuggestionSource, VarianceAlert};
use liasse_import::{
    DetectedColumns, ImportConfig, ImportError, ImportFormat, ImportInput, ImportOutcome,
    ImportPipeline,
};
use rust_decimal::Decimal;
use std::str::FromStr;

fn run_with(config: ImportConfig, file_name: &str, bytes: &[u8]) -> ImportOutcome {
    ImportPipeline::new(config)
        .run(ImportInput {
            file_name,
            bytes,
            ..Default::default()
        })
        .unwrap()
}

fn run(file_name: &str, bytes: &[u8]) -> ImportOutcome {
    run_with(ImportConfig::default(), file_name, bytes)
}

#[test]
fn scenario_a_classic_layout() {
    let json = r#"[["N° Compte","Libellé","Débit","Crédit"],["411","Clients",1000,0]]"#;
    let outcome = run("balance.json", json.as_bytes());

    assert_eq!(
        outcome.structure.detected_columns,
        DetectedColumns {
            account_number: Some(0),
            account_name: Some(1),
            debit: vec![2],
            credit: vec![3],
            ..Default::default()
        }
    );
    assert_eq!(outcome.entries.len(), 1);
    let entry = &outcome.entries[0];
    assert_eq!(entry.compte, "411");
    assert_eq!(entry.solde_debit, Money::from(1000));
    assert_eq!(entry.solde_credit, Money::zero());
}

#[test]
fn scenario_b_half_unit_imbalance() {
    let csv = "Compte;Libellé;Débit;Crédit\n\
               521;Banque;1 000 000,00;\n\
               101;Capital;;999 999,50\n";
    let outcome = run("balance.csv", csv.as_bytes());

    assert!(!outcome.balance_check.is_balanced);
    assert_eq!(
        outcome.balance_check.difference,
        Money::from_decimal(Decimal::from_str("0.5").unwrap())
    );
    assert!(!outcome.report.is_balanced);
    // 0.5 is far below the escalation line of 10.
    assert_eq!(outcome.report.errors, 0);
}

#[test]
fn scenario_c_halved_expense() {
    let current = "Compte;Libellé;Débit;Crédit\n601;Achats;500;\n";
    let prior = BalanceEntry::new("601", "Achats").with_closing(Money::from(1000), Money::zero());
    let outcome = ImportPipeline::default()
        .run(ImportInput {
            file_name: "n.csv",
            bytes: current.as_bytes(),
            prior: vec![prior],
            ..Default::default()
        })
        .unwrap();

    let c = &outcome.comparisons[0];
    assert_eq!(c.variation, Money::from(-500));
    assert_eq!(c.variation_percent, -50.0);
    assert_eq!(c.alert, Some(VarianceAlert::SignificantDecrease));
    assert_eq!(outcome.report.significant_variances, 1);
}

#[test]
fn scenario_d_account_dropped_since_last_year() {
    let current = "Compte;Libellé;Débit;Crédit\n601;Achats;500;\n";
    let prior = vec![
        BalanceEntry::new("601", "Achats").with_closing(Money::from(500), Money::zero()),
        BalanceEntry::new("701", "Ventes").with_closing(Money::zero(), Money::from(800)),
    ];
    let outcome = ImportPipeline::default()
        .run(ImportInput {
            file_name: "n.csv",
            bytes: current.as_bytes(),
            prior,
            ..Default::default()
        })
        .unwrap();

    let missing = outcome
        .comparisons
        .iter()
        .find(|c| c.account == "701")
        .unwrap();
    assert_eq!(missing.current_year, Money::zero());
    assert_eq!(missing.variation_percent, -100.0);
    assert_eq!(missing.alert, Some(VarianceAlert::MissingAccount));
}

#[test]
fn identical_input_gives_identical_output() {
    let csv = "Compte;Intitulé;Mouvement débit;Mouvement crédit;Solde débiteur;Solde créditeur\n\
               101000;Capital social;;;;5 000 000\n\
               CLT;Clients divers;1 200;200;1 000;\n\
               ZZ;Compte d'attente;;;4 999 000;\n";
    let a = run("b.csv", csv.as_bytes());
    let b = run("b.csv", csv.as_bytes());

    assert_eq!(a.structure, b.structure);
    assert_eq!(a.entries, b.entries);
    assert_eq!(a.mapping, b.mapping);
    let mut report_b = b.report.clone();
    report_b.timestamp = a.report.timestamp;
    report_b.processing_time_ms = a.report.processing_time_ms;
    assert_eq!(a.report, report_b);
}

#[test]
fn every_entry_comes_from_a_row_with_an_account() {
    let csv = "Compte;Libellé;Débit;Crédit\n\
               411;Clients;100;\n\
               ;Sous-total;100;\n\
               \u{a0};Vide;;\n\
               701;Ventes;;100\n";
    let outcome = run("b.csv", csv.as_bytes());
    let comptes: Vec<&str> = outcome.entries.iter().map(|e| e.compte.as_str()).collect();
    assert_eq!(comptes, vec!["411", "701"]);
    assert!(outcome.entries.iter().all(|e| !e.compte.is_empty()));
    assert_eq!(outcome.report.skipped_rows, 2);
}

#[test]
fn confidences_stay_in_bounds() {
    let csv = "Compte;Libellé;Débit;Crédit\n\
               4011234567;Fournisseur X;;10\n\
               CAISSE;Caisse;10;\n\
               X1;Inconnu;;\n";
    let outcome = run("b.csv", csv.as_bytes());
    assert!(outcome.structure.detection_confidence <= 100);
    for account in &outcome.mapping.accounts {
        let v = account.mapping_confidence.value();
        assert!((0.0..=100.0).contains(&v));
    }
    for s in &outcome.mapping.pending {
        assert!((0.0..=100.0).contains(&s.confidence.value()));
    }
}

#[test]
fn review_flow_updates_report_and_history() {
    let csv = "Compte;Libellé;Débit;Crédit\n\
               CLT;Clients divers;1000;\n\
               ZZ;Compte d'attente;;1000\n";
    let config = ImportConfig::default();
    let mut outcome = run_with(config.clone(), "b.csv", csv.as_bytes());

    assert_eq!(outcome.mapping.pending.len(), 1);
    assert_eq!(outcome.mapping.pending[0].based_on, SuggestionSource::Ai);
    assert_eq!(outcome.mapping.unmapped, vec!["ZZ".to_string()]);

    let before = outcome.mapping.accounts[0].mapping_confidence;
    outcome.mapping.accept("CLT").unwrap();
    assert!(outcome.mapping.accounts[0].mapping_confidence >= before);
    assert!(outcome.mapping.pending.is_empty());

    outcome.mapping.map_manually("ZZ", "471").unwrap();
    outcome.refresh_report(&config);
    assert_eq!(outcome.report.mapped_accounts, 2);
    assert_eq!(outcome.report.statistics.manual_corrections, 1);
    assert_eq!(outcome.mapping.history.len(), 2);
}

#[test]
fn history_from_a_previous_import_is_reused() {
    let csv = "Compte;Libellé;Débit;Crédit\nCLT;Clients divers;1000;\n";
    let history = vec![liasse_core::MappingHistoryEntry::new("CLT", "4111", 30)];
    let outcome = ImportPipeline::default()
        .run(ImportInput {
            file_name: "b.csv",
            bytes: csv.as_bytes(),
            history,
            ..Default::default()
        })
        .unwrap();
    let s = &outcome.mapping.pending[0];
    assert_eq!(s.suggested_account, "4111");
    assert_eq!(s.based_on, SuggestionSource::History);
    assert_eq!(s.confidence.value(), 93.0);
}

#[test]
fn xml_records_import() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <balance>
          <ligne><compte>411000</compte><libelle>Clients</libelle><debit>250,00</debit><credit></credit></ligne>
          <ligne><compte>701000</compte><libelle>Ventes</libelle><debit></debit><credit>250,00</credit></ligne>
        </balance>"#;
    let outcome = run("export.xml", xml.as_bytes());
    assert_eq!(outcome.format, ImportFormat::Xml);
    assert_eq!(outcome.entries.len(), 2);
    assert!(outcome.balance_check.is_balanced);
    assert_eq!(outcome.mapping.accounts[0].mapped_account.as_deref(), Some("411"));
}

#[test]
fn xlsx_workbook_first_sheet() {
    let outcome = run("balance_2024.xlsx", include_bytes!("fixtures/balance_2024.xlsx"));
    assert_eq!(outcome.format, ImportFormat::Excel);
    assert_eq!(outcome.structure.detection_confidence, 100);

    let comptes: Vec<&str> = outcome.entries.iter().map(|e| e.compte.as_str()).collect();
    assert_eq!(comptes, vec!["101000", "411100", "521000", "601", "701"]);
    assert_eq!(
        outcome.entries[3].solde_debit,
        Money::from_decimal(Decimal::from_str("250000.50").unwrap())
    );
    assert_eq!(outcome.entries[0].solde_credit, Money::from(5_000_000));
    assert!(outcome.balance_check.is_balanced);
    assert_eq!(outcome.report.imported_accounts, 5);
}

#[test]
fn amounts_at_decimal_limit_do_not_abort_the_import() {
    let csv = "Compte;Libellé;Débit;Crédit\n\
               411;Clients;79228162514264337593543950335;\n\
               412;Clients douteux;79228162514264337593543950335;\n";
    let outcome = run("b.csv", csv.as_bytes());
    assert_eq!(outcome.entries.len(), 2);
    assert_eq!(outcome.balance_check.total_debit, Money::from_decimal(Decimal::MAX));
    assert!(!outcome.report.is_balanced);
}

#[test]
fn latin1_csv_with_comma_separator() {
    // "Libellé" and "Crédit" encoded in ISO-8859-1.
    let mut bytes = b"Compte,Libell\xe9,D\xe9bit,Cr\xe9dit\n".to_vec();
    bytes.extend_from_slice(b"571,Caisse,\"1 500,75\",\n");
    let config = ImportConfig {
        encoding: Some("iso-8859-1".to_string()),
        ..Default::default()
    };
    let outcome = run_with(config, "b.csv", &bytes);
    assert_eq!(outcome.structure.detection_confidence, 100);
    assert_eq!(
        outcome.entries[0].solde_debit,
        Money::from_decimal(Decimal::from_str("1500.75").unwrap())
    );
}

#[test]
fn empty_and_header_only_files_are_fatal() {
    let pipeline = ImportPipeline::default();
    let empty = pipeline.run(ImportInput {
        file_name: "b.csv",
        bytes: b"",
        ..Default::default()
    });
    assert!(matches!(empty, Err(ImportError::EmptyFile)));

    let header_only = pipeline.run(ImportInput {
        file_name: "b.csv",
        bytes: b"Compte;Debit;Credit\n",
        ..Default::default()
    });
    assert!(matches!(header_only, Err(ImportError::NoDataRows)));
}
