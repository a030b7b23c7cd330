pub mod handle_booking_event;
