// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
//
// SPDX-License-Identifier: MIT

//! Bindings to the BlockTicket contract.
//!
//! Generated from the human-readable ABI of the deployed contract; the
//! contract itself lives in a separate repository.

use ethers::contract::abigen;

abigen!(
    TicketOffice,
    r#"[
        function createEvent(string name, string description, string venue, uint256 eventDate, uint256[3] prices, uint256[3] supply)
        function updateEventDetails(uint256 eventId, string name, string description, string venue, uint256 eventDate, uint256[3] prices, uint256[3] supply)
        function deleteEvent(uint256 eventId)
        function purchaseTicket(uint256 eventId, uint8 ticketType, string seat) payable
        function useTicket(uint256 ticketId)
        function addAdmin(address account)
        function removeAdmin(address account)
        function getEventDetails(uint256 eventId) view returns (string name, string description, string venue, uint256 eventDate, uint256[3] prices, bool isActive, address creator)
        function getEventSupply(uint256 eventId) view returns (uint256[3] supply, uint256[3] sold)
        function getAvailableTickets(uint256 eventId) view returns (uint256[3] available)
        function getUserTickets(address owner) view returns (uint256[] ticketIds)
        function getTicketDetails(uint256 ticketId) view returns (uint256 eventId, address ticketOwner, uint8 ticketType, uint256 purchasePrice, uint256 purchaseTime, bool isUsed, string seat)
        function verifyTicket(uint256 ticketId) view returns (bool isValid, bool isUsed, string eventName, uint256 eventDate)
        function eventCounter() view returns (uint256)
        function admins(address account) view returns (bool)
        function owner() view returns (address)
    ]"#
);
