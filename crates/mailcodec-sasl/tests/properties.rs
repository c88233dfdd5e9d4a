//! Property tests for the credential encoders.

#![allow(clippy::unwrap_used)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mailcodec_sasl::{Credentials, Mechanism, plain_response, xoauth2_response};
use proptest::prelude::*;

proptest! {
    #[test]
    fn plain_decodes_to_nul_separated_fields(user in "[^\\x00]{0,64}", pass in "[^\\x00]{0,64}") {
        let decoded = STANDARD.decode(plain_response(&user, &pass)).unwrap();
        let text = String::from_utf8(decoded).unwrap();
        let fields: Vec<&str> = text.split('\0').collect();
        prop_assert_eq!(fields, vec!["", user.as_str(), pass.as_str()]);
    }

    #[test]
    fn xoauth2_frames_user_and_token(user in "[a-z0-9.@]{1,40}", token in "[A-Za-z0-9._-]{1,80}") {
        let decoded = STANDARD.decode(xoauth2_response(&user, &token)).unwrap();
        let expected = format!("user={user}\x01auth=Bearer {token}\x01\x01");
        prop_assert_eq!(decoded, expected.into_bytes());
    }

    #[test]
    fn selected_mechanism_always_has_a_usable_response(
        advertised in prop::collection::vec(
            prop::sample::select(vec!["PLAIN", "LOGIN", "XOAUTH2", "OAUTHBEARER", "CRAM-MD5"]),
            0..5,
        ),
        oauth in any::<bool>(),
    ) {
        let credentials = if oauth {
            Credentials::oauth2("user@example.com", "token")
        } else {
            Credentials::password("user", "secret")
        };
        if let Some(mechanism) = credentials.select_mechanism(advertised.iter().copied()) {
            prop_assert!(advertised.contains(&mechanism.name()));
            let response = credentials.initial_response(mechanism).unwrap();
            prop_assert_eq!(response.is_none(), mechanism == Mechanism::Login);
        }
    }
}
