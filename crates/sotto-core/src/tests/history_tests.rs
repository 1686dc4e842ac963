use super::user;
use crate::history::{open_message, OpenedMessage};
use sotto_api::types::Message;
use sotto_crypto::{hybrid, IdentityKeyPair};
use uuid::Uuid;

fn stored_message(
    text: &str,
    sender_keys: &IdentityKeyPair,
    recipient_keys: &IdentityKeyPair,
    with_sender_copy: bool,
) -> Message {
    let encrypted_for_recipient =
        hybrid::encrypt(text.as_bytes(), &recipient_keys.public_key_jwk()).expect("encrypt");
    let encrypted_for_sender = if with_sender_copy {
        Some(hybrid::encrypt(text.as_bytes(), &sender_keys.public_key_jwk()).expect("encrypt"))
    } else {
        None
    };
    Message {
        id: Uuid::new_v4(),
        sender_id: user("alice"),
        recipient_id: user("bob"),
        encrypted_for_recipient,
        encrypted_for_sender,
        delivered: true,
        read: false,
        reactions: Vec::new(),
        reply_to: None,
        file: None,
        created_at_ms: 1,
    }
}

#[test]
fn recipient_opens_the_recipient_envelope() {
    let alice = IdentityKeyPair::generate();
    let bob = IdentityKeyPair::generate();
    let message = stored_message("ciao", &alice, &bob, true);

    assert_eq!(
        open_message(&message, &user("bob"), &bob),
        OpenedMessage::Text("ciao".to_string())
    );
}

#[test]
fn sender_opens_their_own_copy() {
    let alice = IdentityKeyPair::generate();
    let bob = IdentityKeyPair::generate();
    let message = stored_message("ciao", &alice, &bob, true);

    assert_eq!(
        open_message(&message, &user("alice"), &alice),
        OpenedMessage::Text("ciao".to_string())
    );
}

#[test]
fn sent_message_without_a_sender_copy_is_unreadable() {
    let alice = IdentityKeyPair::generate();
    let bob = IdentityKeyPair::generate();
    let message = stored_message("ciao", &alice, &bob, false);

    assert_eq!(
        open_message(&message, &user("alice"), &alice),
        OpenedMessage::Unreadable
    );
    // The recipient side is unaffected.
    assert_eq!(
        open_message(&message, &user("bob"), &bob),
        OpenedMessage::Text("ciao".to_string())
    );
}

#[test]
fn tampered_ciphertext_renders_a_placeholder_not_a_crash() {
    let alice = IdentityKeyPair::generate();
    let bob = IdentityKeyPair::generate();
    let mut message = stored_message("ciao", &alice, &bob, true);
    let last = message.encrypted_for_recipient.ciphertext.len() - 1;
    message.encrypted_for_recipient.ciphertext[last] ^= 0x01;

    assert_eq!(
        open_message(&message, &user("bob"), &bob),
        OpenedMessage::Unreadable
    );
}

#[test]
fn wrong_key_is_unreadable() {
    let alice = IdentityKeyPair::generate();
    let bob = IdentityKeyPair::generate();
    let mallory = IdentityKeyPair::generate();
    let message = stored_message("ciao", &alice, &bob, true);

    assert_eq!(
        open_message(&message, &user("bob"), &mallory),
        OpenedMessage::Unreadable
    );
}

#[test]
fn third_party_has_no_envelope_to_open() {
    let alice = IdentityKeyPair::generate();
    let bob = IdentityKeyPair::generate();
    let message = stored_message("ciao", &alice, &bob, true);

    assert_eq!(
        open_message(&message, &user("carol"), &bob),
        OpenedMessage::Unreadable
    );
}
