mod leader_disconnect;
mod leader_election;
