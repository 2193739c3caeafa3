/*
 * This module provides data aquisition abilites for the application.
 * It doesn't care how the backend discovers devices, just how to ask it.
 */

pub mod http;
