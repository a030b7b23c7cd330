mod helpers;

use booking_rules_domain::{
    BookingEvent, BookingEventName, BookingTeacher, Context, Installment, InstallmentPlan,
    PaymentHistory, TaskStatus,
};
use booking_rules_engine::{
    event::handle_booking_event::HandleBookingEventUseCase,
    execute,
    rule::{run_rules::RunRulesUseCase, save_rule::SaveRuleUseCase},
    task::send_due_notifications::SendDueNotificationsUseCase,
};
use helpers::setup::{rulejson, spawn_app, DAY, NOW};
use serde_json::json;

fn save(contextid: i64, rulejson: String) -> SaveRuleUseCase {
    SaveRuleUseCase {
        rule_id: None,
        contextid,
        rulejson,
        isactive: true,
    }
}

#[tokio::test]
async fn reminds_teachers_a_day_before_their_course() {
    let mut app = spawn_app();
    app.users(&[10, 11]);
    let option = app.option(1, Context::SYSTEM, NOW + 3 * DAY);
    app.insert(&BookingTeacher {
        id: 1,
        optionid: option.id,
        userid: 10,
    });
    let json = rulejson(
        json!({ "seconds": DAY, "datefield": "coursestarttime" }),
        "select_teacher_in_bo",
        json!({}),
    );
    let rule = execute(save(Context::SYSTEM, json), &app.ctx).await.unwrap();

    // Executed on save and again by the job scheduler
    let runs = execute(RunRulesUseCase, &app.ctx).await.unwrap();
    assert_eq!(runs.scheduled_tasks, 1);
    let tasks = app.ctx.repos.task_repo.find_by_rule(&rule.id).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].nextruntime, NOW + 2 * DAY);

    app.set_time(NOW + 2 * DAY);
    let res = execute(SendDueNotificationsUseCase, &app.ctx).await.unwrap();
    assert_eq!(res.sent, 1);
    let mails = app.mailer.sent();
    assert_eq!(mails[0].userid, 10);
    assert_eq!(mails[0].subject, "Course reminder");
    assert!(app.failures.failures().is_empty());
}

#[tokio::test]
async fn rules_apply_to_their_context_and_its_descendants() {
    let app = spawn_app();
    app.users(&[42]);
    for (id, path) in [(1, "/1"), (3, "/1/3"), (30, "/1/30"), (45, "/1/3/45")].iter() {
        app.insert(&Context {
            id: *id,
            path: path.to_string(),
        });
    }
    app.option(1, 3, NOW + 3 * DAY);
    app.option(2, 45, NOW + 3 * DAY);
    app.option(3, 30, NOW + 3 * DAY);
    app.option(4, 1, NOW + 3 * DAY);
    let json = rulejson(
        json!({ "seconds": DAY, "datefield": "coursestarttime" }),
        "select_users",
        json!({ "userids": [42] }),
    );

    let rule = execute(save(3, json), &app.ctx).await.unwrap();

    let tasks = app.ctx.repos.task_repo.find_by_rule(&rule.id).await.unwrap();
    let mut optionids = tasks.iter().map(|t| t.optionid).collect::<Vec<_>>();
    optionids.sort_unstable();
    assert_eq!(optionids, vec![1, 2]);
}

#[tokio::test]
async fn notifies_every_responsible_contact() {
    let app = spawn_app();
    app.users(&[5, 6, 7]);
    let mut option = app.option(1, Context::SYSTEM, NOW + 3 * DAY);
    option.responsiblecontact = Some("5, 6,".into());
    app.insert(&option);
    let mut unassigned = app.option(2, Context::SYSTEM, NOW + 3 * DAY);
    unassigned.responsiblecontact = Some("".into());
    app.insert(&unassigned);
    let json = rulejson(
        json!({ "seconds": DAY, "datefield": "coursestarttime" }),
        "select_responsiblecontact_in_bo",
        json!({}),
    );

    let rule = execute(save(Context::SYSTEM, json), &app.ctx).await.unwrap();

    let tasks = app.ctx.repos.task_repo.find_by_rule(&rule.id).await.unwrap();
    let mut userids = tasks.iter().map(|t| t.userid).collect::<Vec<_>>();
    userids.sort_unstable();
    assert_eq!(userids, vec![5, 6]);
}

#[tokio::test]
async fn reminds_of_open_installments() {
    let app = spawn_app();
    app.users(&[42]);
    app.option(1, Context::SYSTEM, NOW + 30 * DAY);
    let plan = InstallmentPlan {
        payments: vec![
            Installment {
                timestamp: NOW + DAY,
                price: 50.0,
                paid: 1,
            },
            Installment {
                timestamp: NOW + 10 * DAY,
                price: 50.0,
                paid: 0,
            },
            Installment {
                timestamp: NOW + 20 * DAY,
                price: 50.0,
                paid: 0,
            },
        ],
    };
    app.insert(&PaymentHistory::new(1, 1, 42, plan));
    let json = rulejson(
        json!({ "seconds": 3 * DAY, "datefield": "installmentpayment" }),
        "select_user_shopping_cart",
        json!({}),
    );

    let rule = execute(save(Context::SYSTEM, json), &app.ctx).await.unwrap();

    let mut tasks = app.ctx.repos.task_repo.find_by_rule(&rule.id).await.unwrap();
    tasks.sort_by_key(|t| t.nextruntime);
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| t.userid == 42));
    assert_eq!(tasks[0].nextruntime, NOW + 7 * DAY);
    assert_eq!(tasks[1].nextruntime, NOW + 17 * DAY);
}

#[tokio::test]
async fn event_rules_notify_right_away() {
    let app = spawn_app();
    app.users(&[2, 42]);
    app.option(1, Context::SYSTEM, NOW + 3 * DAY);
    let json = rulejson(
        json!({ "boevent": "bookingoption_booked" }),
        "select_user_from_event",
        json!({ "userfromeventtype": "relateduserid" }),
    );
    let rule = execute(save(Context::SYSTEM, json), &app.ctx).await.unwrap();

    let event = BookingEvent {
        eventname: BookingEventName::BookingoptionBooked,
        optionid: 1,
        optiondateid: None,
        userid: 2,
        relateduserid: Some(42),
        timecreated: NOW,
    };
    let res = execute(HandleBookingEventUseCase { event }, &app.ctx)
        .await
        .unwrap();
    assert_eq!(res.scheduled_tasks, 1);

    let res = execute(SendDueNotificationsUseCase, &app.ctx).await.unwrap();
    assert_eq!(res.sent, 1);
    assert_eq!(app.mailer.sent()[0].userid, 42);
    let tasks = app.ctx.repos.task_repo.find_by_rule(&rule.id).await.unwrap();
    assert_eq!(tasks[0].status, TaskStatus::Sent);
}
