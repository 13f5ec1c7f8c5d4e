mod common;

use serde_json::json;

use common::{init_logging, service, PolicyRepository};
use org_policy_pipeline_assembly::{AssemblyError, PolicyKind, PolicySourceKind};

const GET_OBJECT: &str =
    r#"[{"Sid": "AllowGet", "Effect": "Allow", "Action": ["s3:GetObject"], "Resource": "*"}]"#;
const PUT_OBJECT: &str =
    r#"[{"Sid": "AllowPut", "Effect": "Allow", "Action": ["s3:PutObject"], "Resource": "*"}]"#;
const ENVIRONMENTS: &str = r#"[{"ID": "dev", "Target": ["A:111", "B:222"]}]"#;

fn repository() -> PolicyRepository {
    init_logging();
    PolicyRepository::new(PolicyKind::Scp)
        .with_guardrail("g1", GET_OBJECT)
        .with_guardrail("g2", PUT_OBJECT)
        .with_environments(ENVIRONMENTS)
}

#[tokio::test]
async fn merges_guardrails_for_a_single_account() {
    let repo = repository().with_management_records(
        r#"[{"SID": "S1", "Guardrails": ["g1", "g2"], "Policy": "",
             "Target": {"Type": "Account", "ID": "Prod:111111111111"}, "Comments": "prod"}]"#,
    );
    let svc = service();

    let summary = svc.run(&repo.config).await.expect("run should succeed");

    assert_eq!(
        repo.read_output(),
        json!([{
            "target_id": "111111111111",
            "sid": "S1",
            "comments": "prod",
            "policy": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Action": ["s3:GetObject", "s3:PutObject"],
                    "Resource": ["*"]
                }]
            }
        }])
    );
    assert_eq!(summary.rows, 1);
    assert_eq!(summary.records[0].source, PolicySourceKind::Guardrails);
    assert_eq!(summary.records[0].statements_before, 2);
    assert_eq!(summary.records[0].statements_after, 1);
    // Two access checks and one validation.
    assert_eq!(svc.analyzer().calls(), 3);
}

#[tokio::test]
async fn environment_fans_out_to_every_target() {
    let repo = repository().with_management_records(
        r#"[{"SID": "S2", "Guardrails": ["g1"], "Policy": "",
             "Target": {"Type": "Environment", "ID": "dev"}, "Comments": ""}]"#,
    );

    service().run(&repo.config).await.expect("run should succeed");

    let output = repo.read_output();
    let rows = output.as_array().expect("output should be an array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["target_id"], "111");
    assert_eq!(rows[1]["target_id"], "222");
    assert_eq!(rows[0]["sid"], rows[1]["sid"]);
    assert_eq!(rows[0]["policy"], rows[1]["policy"]);
}

#[tokio::test]
async fn missing_environment_aborts_without_output() {
    let repo = repository().with_management_records(
        r#"[{"SID": "S1", "Guardrails": ["g1"], "Policy": "",
             "Target": {"Type": "Account", "ID": "Prod:111111111111"}, "Comments": ""},
            {"SID": "S3", "Guardrails": ["g2"], "Policy": "",
             "Target": {"Type": "Environment", "ID": "missing"}, "Comments": ""}]"#,
    );

    let err = service().run(&repo.config).await.unwrap_err();

    assert!(matches!(err, AssemblyError::EnvironmentNotFound { .. }));
    assert_eq!(err.to_string(), "Environment ID not found for SID S3: missing");
    assert!(!repo.config.output_file.exists());
}

#[tokio::test]
async fn duplicate_sid_aborts_before_processing() {
    let repo = repository().with_management_records(
        r#"[{"SID": "S1", "Guardrails": ["g1"], "Policy": "",
             "Target": {"Type": "Account", "ID": "Prod:111111111111"}, "Comments": ""},
            {"SID": "S1", "Guardrails": ["g2"], "Policy": "",
             "Target": {"Type": "Account", "ID": "Dev:222222222222"}, "Comments": ""}]"#,
    );
    let svc = service();

    let err = svc.run(&repo.config).await.unwrap_err();

    assert!(matches!(err, AssemblyError::DuplicateSid { ref sid } if sid == "S1"));
    assert!(!repo.config.output_file.exists());
    assert_eq!(svc.analyzer().calls(), 0);
}
