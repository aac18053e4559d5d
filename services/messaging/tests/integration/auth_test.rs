use chrono::{Duration, Utc};

use courier_messaging::error::MessagingError;
use courier_messaging::usecase::auth::{
    SignInInput, SignInUseCase, VerifySignInInput, VerifySignInUseCase,
};

use crate::helpers::{MockMailer, MockUserRepo, MockVerificationCodeRepo, test_user};

const TEST_SECRET: &str = "integration-test-secret";

#[tokio::test]
async fn should_create_account_on_first_sign_in() {
    let users = MockUserRepo::empty();
    let codes = MockVerificationCodeRepo::empty();
    let users_handle = users.users_handle();
    let codes_handle = codes.codes_handle();

    let uc = SignInUseCase {
        users,
        codes,
        mailer: MockMailer::new(),
    };
    uc.execute(SignInInput {
        email: "New.Person@Example.COM".to_owned(),
    })
    .await
    .unwrap();

    let users = users_handle.lock().unwrap();
    assert_eq!(users.len(), 1, "expected the user to be created");
    assert_eq!(users[0].email, "new.person@example.com");
    assert_eq!(users[0].fullname, "new.person@example.com");

    let codes = codes_handle.lock().unwrap();
    let code = codes.get(&users[0].id).expect("a code should exist");
    assert_eq!(code.code.len(), 6);
    assert!(code.code.chars().all(|c| c.is_ascii_digit()));
    assert!(code.expires_at > Utc::now());
}

#[tokio::test]
async fn should_overwrite_existing_code_for_known_user() {
    let user = test_user("alice@example.com");
    let users = MockUserRepo::new(vec![user.clone()]);
    let codes =
        MockVerificationCodeRepo::with_code(user.id, "111111", Utc::now() + Duration::minutes(5));
    let users_handle = users.users_handle();
    let codes_handle = codes.codes_handle();

    let uc = SignInUseCase {
        users,
        codes,
        mailer: MockMailer::new(),
    };
    uc.execute(SignInInput {
        email: user.email.clone(),
    })
    .await
    .unwrap();

    assert_eq!(users_handle.lock().unwrap().len(), 1, "no duplicate user");
    let codes = codes_handle.lock().unwrap();
    assert_eq!(codes.len(), 1, "the code row is reused, not accumulated");
    assert_ne!(codes.get(&user.id).unwrap().code, "111111");
}

#[tokio::test]
async fn should_mail_the_code_without_failing_the_request() {
    let user = test_user("bob@example.com");
    let mailer = MockMailer::new();
    let sent_handle = mailer.sent_handle();
    let codes = MockVerificationCodeRepo::empty();
    let codes_handle = codes.codes_handle();

    let uc = SignInUseCase {
        users: MockUserRepo::new(vec![user.clone()]),
        codes,
        mailer,
    };
    uc.execute(SignInInput {
        email: user.email.clone(),
    })
    .await
    .unwrap();

    // The mail goes out on a detached task; give it a moment.
    for _ in 0..100 {
        if !sent_handle.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let sent = sent_handle.lock().unwrap();
    assert_eq!(sent.len(), 1, "exactly one mail should go out");
    let (to, mailed_code) = &sent[0];
    assert_eq!(to, "bob@example.com");
    let stored = codes_handle.lock().unwrap().get(&user.id).unwrap().code.clone();
    assert_eq!(mailed_code, &stored, "the mailed code matches the stored one");
}

#[tokio::test]
async fn should_issue_token_for_valid_code() {
    let user = test_user("carol@example.com");
    let uc = VerifySignInUseCase {
        users: MockUserRepo::new(vec![user.clone()]),
        codes: MockVerificationCodeRepo::with_code(
            user.id,
            "123456",
            Utc::now() + Duration::minutes(5),
        ),
        jwt_secret: TEST_SECRET.to_owned(),
        token_ttl_secs: 3600,
    };

    let token = uc
        .execute(VerifySignInInput {
            email: "Carol@Example.com".to_owned(),
            code: "123456".to_owned(),
        })
        .await
        .unwrap();

    let info = courier_auth_types::token::validate_access_token(&token, TEST_SECRET).unwrap();
    assert_eq!(info.user_id, user.id);
}

#[tokio::test]
async fn should_reject_unknown_email() {
    let uc = VerifySignInUseCase {
        users: MockUserRepo::empty(),
        codes: MockVerificationCodeRepo::empty(),
        jwt_secret: TEST_SECRET.to_owned(),
        token_ttl_secs: 3600,
    };

    let result = uc
        .execute(VerifySignInInput {
            email: "nobody@example.com".to_owned(),
            code: "123456".to_owned(),
        })
        .await;

    assert!(
        matches!(result, Err(MessagingError::BadRequest(ref m)) if m == "Email not found"),
        "got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_wrong_code() {
    let user = test_user("dave@example.com");
    let uc = VerifySignInUseCase {
        users: MockUserRepo::new(vec![user.clone()]),
        codes: MockVerificationCodeRepo::with_code(
            user.id,
            "123456",
            Utc::now() + Duration::minutes(5),
        ),
        jwt_secret: TEST_SECRET.to_owned(),
        token_ttl_secs: 3600,
    };

    let result = uc
        .execute(VerifySignInInput {
            email: user.email.clone(),
            code: "654321".to_owned(),
        })
        .await;

    assert!(
        matches!(result, Err(MessagingError::BadRequest(ref m)) if m == "Invalid verification code"),
        "got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_expired_code() {
    let user = test_user("erin@example.com");
    let uc = VerifySignInUseCase {
        users: MockUserRepo::new(vec![user.clone()]),
        codes: MockVerificationCodeRepo::with_code(
            user.id,
            "123456",
            Utc::now() - Duration::minutes(1),
        ),
        jwt_secret: TEST_SECRET.to_owned(),
        token_ttl_secs: 3600,
    };

    let result = uc
        .execute(VerifySignInInput {
            email: user.email.clone(),
            code: "123456".to_owned(),
        })
        .await;

    assert!(
        matches!(result, Err(MessagingError::BadRequest(ref m)) if m == "Invalid verification code"),
        "got {result:?}"
    );
}
