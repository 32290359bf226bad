use assert_cmd::Command;
use predicates as pred;

#[test]
fn end_to_end_workload_conserves_the_balance_total() {
    // 2 workers, 50 transfers each, 16 accounts seeded at 1000.
    let exe = env!("CARGO_BIN_EXE_bank_workload");
    let mut cmd = Command::new(exe);
    cmd.args(["2", "50", "16"]);

    cmd.assert()
        .success()
        .stdout(pred::str::contains("committed:"))
        .stdout(pred::str::contains("ledger entries:"))
        .stdout(pred::str::contains(
            "balance total: opening=16000 closing=16000",
        ));
}

#[test]
fn rejects_malformed_arguments() {
    let exe = env!("CARGO_BIN_EXE_bank_workload");
    let mut cmd = Command::new(exe);
    cmd.arg("not-a-number");

    cmd.assert().failure();
}
